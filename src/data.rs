//! Random-access byte sources.
//!
//! Every archive, nested or not, reads from a [`ByteRange`]:
//! a window onto some shared, immutable storage.
//! The root range owns the storage (a memory-mapped file or a heap buffer);
//! subsections are views that share it by reference count,
//! so the storage lives until the last view into it is dropped.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;
use camino::Utf8Path;
use log::*;
use memmap2::Mmap;

use crate::arch::usize;
use crate::result::*;

/// How a [`ByteStream`] may be consumed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadMode {
    /// A single front-to-back pass. The stream can't seek,
    /// and shouldn't be kept around after it hits EOF.
    Once,
    /// Independent, repeatable reads. The stream can seek,
    /// and its cursor is its own; no two streams share one.
    PerRead,
}

/// A contiguous, immutable window of bytes.
///
/// Cloning a range or taking a [`subsection`](Self::subsection) of it
/// never copies the underlying bytes.
#[derive(Clone)]
pub struct ByteRange {
    bytes: Bytes,
    /// Where `bytes` starts in the root storage
    offset: u64,
}

impl ByteRange {
    /// Wraps a heap buffer as a root range.
    pub fn new<B: Into<Bytes>>(bytes: B) -> Self {
        Self {
            bytes: bytes.into(),
            offset: 0,
        }
    }

    /// Memory-maps the file at `path` as a root range.
    ///
    /// The mapping is unmapped once this range and every view into it
    /// (including nested archives) are dropped.
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> JarResult<Self> {
        let path = path.as_ref();
        debug!("Memory mapping {path}");
        let file = File::open(path)?;
        // Safety: the usual mmap caveat applies.
        // If someone truncates the file out from under us, we'll fault.
        let mapping = unsafe { Mmap::map(&file)? };
        Ok(Self::new(Bytes::from_owner(mapping)))
    }

    /// Length of the range in bytes
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The range's position in the root storage it views
    pub fn root_offset(&self) -> u64 {
        self.offset
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Borrows `length` bytes starting at `offset`.
    ///
    /// Fails with [`JarError::OutOfRange`] if any part of that
    /// lies past the end of the range. Nothing is clamped.
    pub fn read(&self, offset: u64, length: u64) -> JarResult<&[u8]> {
        let (start, end) = self.bounds(offset, length)?;
        Ok(&self.bytes[start..end])
    }

    /// Copies bytes at `offset` into `buf`, returning how many were copied.
    ///
    /// Positional; there's no cursor, so any number of threads can call this at once.
    /// Short counts only happen at the end of the range.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> JarResult<usize> {
        if offset > self.len() {
            return Err(self.out_of_range(offset, buf.len() as u64));
        }
        let start = usize(offset)?;
        let available = &self.bytes[start..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        Ok(count)
    }

    /// Returns a view of `length` bytes starting at `offset`.
    pub fn subsection(&self, offset: u64, length: u64) -> JarResult<ByteRange> {
        let (start, end) = self.bounds(offset, length)?;
        Ok(Self {
            bytes: self.bytes.slice(start..end),
            offset: self.offset + offset,
        })
    }

    /// Returns a stream over the whole range.
    pub fn open_stream(&self, mode: ReadMode) -> ByteStream {
        ByteStream {
            bytes: self.bytes.clone(),
            position: 0,
            mode,
        }
    }

    fn bounds(&self, offset: u64, length: u64) -> JarResult<(usize, usize)> {
        match offset.checked_add(length) {
            Some(end) if end <= self.len() => Ok((usize(offset)?, usize(end)?)),
            _ => Err(self.out_of_range(offset, length)),
        }
    }

    fn out_of_range(&self, offset: u64, length: u64) -> JarError {
        JarError::OutOfRange {
            offset,
            length,
            size: self.len(),
        }
    }
}

impl std::fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteRange")
            .field("offset", &self.offset)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<Vec<u8>> for ByteRange {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<Bytes> for ByteRange {
    fn from(b: Bytes) -> Self {
        Self::new(b)
    }
}

/// A stream over a [`ByteRange`], created by [`ByteRange::open_stream()`]
///
/// Streams are `Send` and own a reference to their storage,
/// so they can outlive the range (and archive) they came from.
pub struct ByteStream {
    bytes: Bytes,
    position: usize,
    mode: ReadMode,
}

impl ByteStream {
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Bytes left before EOF
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.bytes.get(self.position..).unwrap_or_default();
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.position += count;
        Ok(count)
    }
}

impl Seek for ByteStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.mode == ReadMode::Once {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "Can't seek a read-once stream",
            ));
        }
        let len = self.bytes.len() as i128;
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::End(d) => len + d as i128,
            SeekFrom::Current(d) => self.position as i128 + d as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Seek before the start of the stream",
            ));
        }
        // Seeking past the end is allowed; reads there just return 0.
        self.position = usize::try_from(target).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "Seek past the address space")
        })?;
        Ok(self.position as u64)
    }
}
