//! Read-ahead resource with seek-correct buffer invalidation.
//!
//! The descriptor is always ahead of what the caller has seen by exactly the
//! number of buffered-but-unread bytes, so the logical position is
//! `descriptor position - buffered()`. Seeks keep that relation intact:
//!
//! - `Current(0)` reports the logical position and leaves the buffer alone.
//! - `Current(n)` with `0 < n <= buffered()` just skips `n` buffered bytes.
//! - Any other `Current(n)` moves the descriptor by `n - buffered()`.
//! - `Start`/`End` move the descriptor directly.
//!
//! The last two always drop the buffer.

use super::{closed_error, ResourceMetadata};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Resource reading through an internal buffer.
#[derive(Debug)]
pub struct BufferedResource {
    file: Option<File>,
    buf: Box<[u8]>,
    /// Next unread byte in `buf`.
    pos: usize,
    /// End of valid data in `buf`.
    filled: usize,
    metadata: ResourceMetadata,
}

impl BufferedResource {
    /// Wrap `file` behind a buffer of `capacity` bytes (at least one).
    pub fn new(file: File, metadata: ResourceMetadata, capacity: usize) -> Self {
        Self {
            file: Some(file),
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
            metadata,
        }
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from the descriptor but not yet handed to the caller.
    pub fn buffered(&self) -> usize {
        self.filled - self.pos
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.file.take();
        self.discard_buffer();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn discard_buffer(&mut self) {
        self.pos = 0;
        self.filled = 0;
    }
}

impl Read for BufferedResource {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let file = self.file.as_mut().ok_or_else(closed_error)?;

        if out.is_empty() {
            return Ok(0);
        }

        if self.pos == self.filled {
            // Nothing buffered and the caller wants at least a buffer's worth:
            // skip the copy.
            if out.len() >= self.buf.len() {
                return file.read(out);
            }

            self.pos = 0;
            self.filled = 0;
            self.filled = file.read(&mut self.buf)?;
        }

        let available = &self.buf[self.pos..self.filled];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for BufferedResource {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let buffered = (self.filled - self.pos) as u64;
        let file = self.file.as_mut().ok_or_else(closed_error)?;

        match target {
            SeekFrom::Current(0) => {
                let at = file.stream_position()?;
                Ok(at - buffered)
            }
            SeekFrom::Current(offset) if offset > 0 && offset as u64 <= buffered => {
                self.pos += offset as usize;
                let at = file.stream_position()?;
                Ok(at - (self.filled - self.pos) as u64)
            }
            SeekFrom::Current(offset) => {
                let adjusted = offset.checked_sub(buffered as i64).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset overflow")
                })?;
                let at = file.seek(SeekFrom::Current(adjusted))?;
                self.pos = 0;
                self.filled = 0;
                Ok(at)
            }
            absolute => {
                let at = file.seek(absolute)?;
                self.pos = 0;
                self.filled = 0;
                Ok(at)
            }
        }
    }
}
