//! Reelhouse - Home video streaming server
//!
//! This library crate exposes the server pieces for integration testing.

pub mod config;
pub mod server;
pub mod streaming;
