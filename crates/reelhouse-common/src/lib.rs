//! Reelhouse-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across reelhouse:
//!
//! - **Typed IDs**: [`EntryId`] (time-ordered UUID) and [`VolumeId`] wrappers
//! - **Path Utilities**: The media extension allow-list and category derivation
//! - **Error Handling**: The error taxonomy shared by the catalog and the server
//!
//! # Examples
//!
//! ```
//! use reelhouse_common::{EntryId, Error, Result};
//! use reelhouse_common::paths::is_media_file;
//! use std::path::Path;
//!
//! let id = EntryId::new();
//! assert!(!id.is_nil());
//!
//! assert!(is_media_file(Path::new("movie.mp4")));
//! assert!(!is_media_file(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("entry"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::*;
