use super::{closed_error, ResourceMetadata};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Unbuffered resource: reads and seeks go straight to the descriptor.
#[derive(Debug)]
pub struct DirectResource {
    file: Option<File>,
    metadata: ResourceMetadata,
}

impl DirectResource {
    pub fn new(file: File, metadata: ResourceMetadata) -> Self {
        Self {
            file: Some(file),
            metadata,
        }
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.file.take();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(closed_error)
    }
}

impl Read for DirectResource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }
}

impl Seek for DirectResource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file()?.seek(pos)
    }
}
