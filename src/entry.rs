//! Handles to individual archive members

use std::io::{self, Read};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use flate2::read::DeflateDecoder;
use log::*;

use crate::arch::usize;
use crate::ascii::AsciiBytes;
use crate::codec::fill;
use crate::crc_reader::Crc32Reader;
use crate::data::{ByteRange, ReadMode};
use crate::format::{self, CompressionMethod, LocalFileHeader};
use crate::header::FileHeader;
use crate::result::*;

/// DEFLATE tops out around 1032:1, so any entry claiming to inflate
/// past this is lying to us (and we shouldn't allocate what it asks for).
const MAX_DEFLATE_RATIO: u64 = 1032;

/// An entry in a [`JarFile`](crate::JarFile): its central directory record,
/// plus a handle on the archive's bytes so it can read its own data.
///
/// Entries are cheap to clone, `Send`, and `Sync`.
/// Reading one never disturbs another, so they can be read from as many
/// threads as you like.
#[derive(Debug, Clone)]
pub struct JarEntry {
    header: FileHeader,
    /// The archive this entry is in, starting at the archive start
    archive: ByteRange,
    /// Where the entry's data starts in `archive`, once we've found its local header
    data_offset: OnceLock<u64>,
}

impl JarEntry {
    pub(crate) fn new(header: FileHeader, archive: ByteRange) -> Self {
        Self {
            header,
            archive,
            data_offset: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &AsciiBytes {
        &self.header.name
    }

    pub fn comment(&self) -> &AsciiBytes {
        &self.header.comment
    }

    /// The raw extra field from the central directory
    pub fn extra(&self) -> &[u8] {
        &self.header.extra
    }

    pub fn compressed_size(&self) -> u64 {
        self.header.compressed_size as u64
    }

    /// Uncompressed size in bytes
    pub fn size(&self) -> u64 {
        self.header.uncompressed_size as u64
    }

    pub fn method(&self) -> CompressionMethod {
        self.header.method()
    }

    /// The CRC-32 of the uncompressed data
    pub fn crc32(&self) -> u32 {
        self.header.crc32
    }

    /// By convention, directories are entries whose names end in a `/`.
    pub fn is_directory(&self) -> bool {
        self.header.is_directory()
    }

    pub fn is_encrypted(&self) -> bool {
        self.header.is_encrypted()
    }

    pub fn last_modified(&self) -> Option<NaiveDateTime> {
        self.header.last_modified()
    }

    /// The central directory record this entry came from
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Where the entry's (possibly compressed) data starts
    /// in the owning archive's bytes.
    ///
    /// The central directory only tells us where the entry's local header is.
    /// The data follows it, after a name and extra field whose lengths
    /// the local header encodes for itself, so we have to go read it.
    /// That happens once; the result is cached.
    pub fn data_offset(&self) -> JarResult<u64> {
        if let Some(offset) = self.data_offset.get() {
            return Ok(*offset);
        }

        let header_offset = self.header.local_header_offset as u64;
        let local_bytes = self
            .archive
            .as_slice()
            .get(usize(header_offset)?..)
            .ok_or(JarError::Malformed(
                "Local file header offset is past the end of the archive",
            ))?;
        let (local, local_size) = LocalFileHeader::parse(local_bytes)?;
        trace!("{:?}", local);
        if cfg!(feature = "check-local-metadata") {
            self.check_local_header(&local)?;
        }

        let offset = header_offset + local_size as u64;
        let available = self.archive.len() - offset;
        if self.compressed_size() > available {
            return Err(JarError::TruncatedData {
                name: self.name().to_string(),
                expected: self.compressed_size(),
                actual: available,
            });
        }
        Ok(*self.data_offset.get_or_init(|| offset))
    }

    fn check_local_header(&self, local: &LocalFileHeader) -> JarResult<()> {
        let mismatch = local.path != self.name().as_bytes()
            || local.compression_method != self.header.compression_method
            || (!format::has_data_descriptor(local.flags)
                && (local.crc32 != self.header.crc32
                    || local.compressed_size != self.header.compressed_size
                    || local.uncompressed_size != self.header.uncompressed_size));
        if mismatch {
            return Err(JarError::Malformed(
                "Central directory entry doesn't match local file header",
            ));
        }
        Ok(())
    }

    /// The entry's data as stored, compressed or not
    pub fn raw_data(&self) -> JarResult<ByteRange> {
        self.archive
            .subsection(self.data_offset()?, self.compressed_size())
    }

    /// Returns a reader of the entry's uncompressed contents.
    ///
    /// The reader checks the contents' length and CRC-32 as it goes,
    /// returning an error from the read that hits EOF if either is off.
    pub fn reader(&self) -> JarResult<Box<dyn Read + Send>> {
        self.check_readable()?;
        let stream = self.raw_data()?.open_stream(ReadMode::Once);
        debug!("Reading {}", self.name());
        Ok(match self.method() {
            CompressionMethod::Deflate => Box::new(Crc32Reader::new(
                DeflateDecoder::new(stream),
                self.crc32(),
                self.size(),
            )),
            _ => {
                self.check_stored_size()?;
                Box::new(Crc32Reader::new(stream, self.crc32(), self.size()))
            }
        })
    }

    /// Reads the entry's uncompressed contents into memory.
    pub fn read_to_vec(&self) -> JarResult<Vec<u8>> {
        self.check_readable()?;
        let raw = self.raw_data()?;
        let contents = match self.method() {
            CompressionMethod::Deflate => self.inflate(&raw)?,
            _ => {
                self.check_stored_size()?;
                raw.as_slice().to_vec()
            }
        };
        self.check_crc(&contents)?;
        Ok(contents)
    }

    /// Returns the entry's uncompressed contents as a byte range.
    ///
    /// Stored entries are viewed in place (no copy, no CRC pass);
    /// deflated ones are inflated into a new buffer and checked.
    /// This is how nested archives get their bytes.
    pub fn contents(&self) -> JarResult<ByteRange> {
        self.check_readable()?;
        let raw = self.raw_data()?;
        match self.method() {
            CompressionMethod::Deflate => {
                let inflated = self.inflate(&raw)?;
                self.check_crc(&inflated)?;
                Ok(ByteRange::new(inflated))
            }
            _ => {
                self.check_stored_size()?;
                Ok(raw)
            }
        }
    }

    /// Fails for entries whose data we can't decode.
    /// (We don't fail for these when building the index,
    /// so one odd entry doesn't sink the whole archive.)
    fn check_readable(&self) -> JarResult<()> {
        if self.is_encrypted() {
            return Err(JarError::UnsupportedArchive(format!(
                "Can't read encrypted entry {}",
                self.name()
            )));
        }
        if let CompressionMethod::Unsupported(method) = self.method() {
            return Err(JarError::UnsupportedCompression {
                name: self.name().to_string(),
                method,
            });
        }
        Ok(())
    }

    /// A stored entry's bytes are its contents, so both sizes must agree.
    fn check_stored_size(&self) -> JarResult<()> {
        if self.compressed_size() < self.size() {
            return Err(JarError::TruncatedData {
                name: self.name().to_string(),
                expected: self.size(),
                actual: self.compressed_size(),
            });
        }
        if self.compressed_size() > self.size() {
            return Err(JarError::Malformed(
                "Stored entry's compressed and uncompressed sizes differ",
            ));
        }
        Ok(())
    }

    fn inflate(&self, raw: &ByteRange) -> JarResult<Vec<u8>> {
        let most_possible = self
            .compressed_size()
            .saturating_mul(MAX_DEFLATE_RATIO)
            .saturating_add(64);
        if self.size() > most_possible {
            return Err(JarError::TruncatedData {
                name: self.name().to_string(),
                expected: self.size(),
                actual: most_possible,
            });
        }

        let mut contents = vec![0; usize(self.size())?];
        let mut decoder = DeflateDecoder::new(raw.open_stream(ReadMode::Once));
        match fill(&mut decoder, &mut contents) {
            Ok(()) => Ok(contents),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(JarError::TruncatedData {
                name: self.name().to_string(),
                expected: self.size(),
                actual: decoder.total_out(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn check_crc(&self, contents: &[u8]) -> JarResult<()> {
        if crc32fast::hash(contents) != self.crc32() {
            return Err(JarError::InvalidChecksum(self.name().to_string()));
        }
        Ok(())
    }
}
