//! Common error types used throughout reelhouse.
//!
//! The catalog and resource layers never write responses or log on their own;
//! they return one of these variants and let the serving layer classify it.
//! [`Error::http_status`] gives the canonical status code for each class.

use std::path::{Path, PathBuf};

/// Common error type for reelhouse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A relative path tried to leave its mount root.
    ///
    /// Only the requested relative path is carried; the resolved absolute
    /// path is never part of the error.
    #[error("Path outside root directory: {}", path.display())]
    PathOutsideRoot {
        /// The relative path as it was requested.
        path: PathBuf,
    },

    /// The configured resource mode is not one we know how to open.
    #[error("Unsupported resource mode: {0}")]
    UnsupportedMode(String),

    /// The requested entry was not found.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// An entry references a volume that is not mounted.
    #[error("Volume not found: {0}")]
    VolumeNotFound(String),

    /// Waiting for an I/O slot was cancelled before one became free.
    #[error("I/O admission cancelled")]
    LimiterCancelled,

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new VolumeNotFound error.
    pub fn volume_not_found<S: Into<String>>(volume: S) -> Self {
        Self::VolumeNotFound(volume.into())
    }

    /// Create a new UnsupportedMode error.
    pub fn unsupported_mode<S: Into<String>>(mode: S) -> Self {
        Self::UnsupportedMode(mode.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new PathOutsideRoot error for the requested relative path.
    pub fn path_outside_root(path: &Path) -> Self {
        Self::PathOutsideRoot {
            path: path.to_path_buf(),
        }
    }

    /// Whether this is a traversal rejection.
    pub fn is_path_outside_root(&self) -> bool {
        matches!(self, Self::PathOutsideRoot { .. })
    }

    /// Whether this error means "nothing there": a missing entry or a
    /// missing file on disk.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::PathOutsideRoot { .. } => 403,
            Self::UnsupportedMode(_) => 501,
            Self::NotFound(_) => 404,
            Self::VolumeNotFound(_) => 503,
            Self::LimiterCancelled => 503,
            Self::InvalidInput(_) => 400,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => 404,
            Self::Io(_) => 500,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
