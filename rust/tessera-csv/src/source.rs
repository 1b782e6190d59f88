//! Byte sources the CSV reader pulls from: sequential reads for parsing,
//! positioned re-reads for line reconstruction.

use std::io::{Read, Seek, SeekFrom};

use tessera_common::{Error, Result};

/// Blocking byte source for one CSV file.
///
/// `read_at` must leave the sequential position untouched; it exists so
/// diagnostics can re-read a recorded byte range after the parse buffer has
/// moved on. Sources that cannot seek (e.g. a decompression stream) report
/// `can_seek() == false` and diagnostics degrade gracefully.
pub trait ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;
    fn seek_to(&mut self, offset: u64) -> Result<()>;
    fn can_seek(&self) -> bool;
    fn size(&self) -> u64;
}

/// File-backed source.
pub struct FileSource {
    file: std::fs::File,
    size: u64,
}

impl FileSource {
    pub fn open(path: &std::path::Path) -> Result<FileSource> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        let size = file
            .metadata()
            .map_err(|e| Error::io(path.display().to_string(), e))?
            .len();
        Ok(FileSource { file, size })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file
            .read(buf)
            .map_err(|e| Error::io("csv read", e))
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let current = self
            .file
            .stream_position()
            .map_err(|e| Error::io("csv seek", e))?;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io("csv seek", e))?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .file
                .read(&mut buf[filled..])
                .map_err(|e| Error::io("csv read", e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.file
            .seek(SeekFrom::Start(current))
            .map_err(|e| Error::io("csv seek", e))?;
        Ok(filled)
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io("csv seek", e))?;
        Ok(())
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// In-memory source over owned bytes.
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
    seekable: bool,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> MemorySource {
        MemorySource {
            data,
            pos: 0,
            seekable: true,
        }
    }

    /// A source that refuses positioned reads, mimicking a decompression
    /// layer for diagnostics-degradation tests.
    pub fn unseekable(data: Vec<u8>) -> MemorySource {
        MemorySource {
            data,
            pos: 0,
            seekable: false,
        }
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if !self.seekable {
            return Err(Error::invalid_arg("source", "positioned reads unsupported"));
        }
        let offset = (offset as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - offset);
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        Ok(n)
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.pos = (offset as usize).min(self.data.len());
        Ok(())
    }

    fn can_seek(&self) -> bool {
        self.seekable
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
