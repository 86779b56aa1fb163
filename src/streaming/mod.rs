//! Media streaming module.
//!
//! # Routes
//!
//! - `GET|HEAD /stream/{id}` - Direct file streaming with range support
//! - `GET /playlist.m3u[?category=]` - M3U playlist of the catalog

mod direct;
mod headers;
mod playlist;
mod range;

pub use direct::stream_file;
pub use playlist::{playlist, render_m3u};
pub use range::ByteRange;

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create direct streaming router.
pub fn stream_router() -> Router<AppContext> {
    Router::new().route("/:id", get(stream_file))
}
