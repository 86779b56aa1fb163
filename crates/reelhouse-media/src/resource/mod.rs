//! Seekable, closable handles over an open media file.
//!
//! A [`Resource`] is either [`Direct`](Resource::Direct), passing every read
//! and seek straight to the descriptor, or [`Buffered`](Resource::Buffered),
//! reading ahead into an internal buffer that is never allowed to serve stale
//! bytes after a seek. Both carry metadata captured once, when the file was
//! opened.

mod buffered;
mod direct;

pub use buffered::BufferedResource;
pub use direct::DirectResource;

use reelhouse_common::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::str::FromStr;
use std::time::SystemTime;

/// How the manager opens resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceMode {
    /// Unbuffered passthrough.
    Direct,
    /// Read-ahead buffer in front of the descriptor.
    #[default]
    Buffered,
}

impl fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Buffered => write!(f, "buffered"),
        }
    }
}

impl FromStr for ResourceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "buffered" => Ok(Self::Buffered),
            _ => Err(Error::unsupported_mode(s)),
        }
    }
}

impl Serialize for ResourceMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Static metadata captured when a resource is opened. Never re-stat'd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    name: String,
    modified: SystemTime,
    size: u64,
}

impl ResourceMetadata {
    pub fn new(name: impl Into<String>, modified: SystemTime, size: u64) -> Self {
        Self {
            name: name.into(),
            modified,
            size,
        }
    }

    /// Capture metadata from an already-open file.
    pub fn from_file(name: impl Into<String>, file: &File) -> io::Result<Self> {
        let metadata = file.metadata()?;
        Ok(Self::new(name, metadata.modified()?, metadata.len()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// An open media file.
#[derive(Debug)]
pub enum Resource {
    Direct(DirectResource),
    Buffered(BufferedResource),
}

impl Resource {
    /// Wrap `file` without buffering.
    pub fn direct(file: File, metadata: ResourceMetadata) -> Self {
        Self::Direct(DirectResource::new(file, metadata))
    }

    /// Wrap `file` behind a read-ahead buffer of `capacity` bytes.
    pub fn buffered(file: File, metadata: ResourceMetadata, capacity: usize) -> Self {
        Self::Buffered(BufferedResource::new(file, metadata, capacity))
    }

    pub fn mode(&self) -> ResourceMode {
        match self {
            Self::Direct(_) => ResourceMode::Direct,
            Self::Buffered(_) => ResourceMode::Buffered,
        }
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        match self {
            Self::Direct(r) => r.metadata(),
            Self::Buffered(r) => r.metadata(),
        }
    }

    /// File name, extension included.
    pub fn name(&self) -> &str {
        self.metadata().name()
    }

    pub fn modified(&self) -> SystemTime {
        self.metadata().modified()
    }

    pub fn size(&self) -> u64 {
        self.metadata().size()
    }

    /// Release the descriptor. Safe to call more than once, and after a
    /// failed read or seek; later reads and seeks fail.
    pub fn close(&mut self) -> io::Result<()> {
        match self {
            Self::Direct(r) => r.close(),
            Self::Buffered(r) => r.close(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Direct(r) => r.is_closed(),
            Self::Buffered(r) => r.is_closed(),
        }
    }
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Direct(r) => r.read(buf),
            Self::Buffered(r) => r.read(buf),
        }
    }
}

impl Seek for Resource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Direct(r) => r.seek(pos),
            Self::Buffered(r) => r.seek(pos),
        }
    }
}

fn closed_error() -> io::Error {
    io::Error::other("resource is closed")
}
