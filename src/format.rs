//! Bits of the ZIP file format shared by the other modules.
//!
//! We try to keep the nitty gritty here and in the record parsers
//! ([`eocd`], [`header`]), and higher-level stuff in [`read`].
//!
//! Most comments quote [`APPNOTE.TXT`].
//!
//! [`eocd`]: ../eocd/index.html
//! [`header`]: ../header/index.html
//! [`read`]: ../read/index.html
//! [`APPNOTE.TXT`]: https://pkware.cachefly.net/webdocs/APPNOTE/APPNOTE-6.3.6.TXT

use chrono::{NaiveDate, NaiveDateTime};

use crate::codec::*;
use crate::result::*;

// Magic numbers denoting various sections of a ZIP archive

/// End of central directory magic number
pub const EOCDR_MAGIC: [u8; 4] = [b'P', b'K', 5, 6];
/// Central directory magic number
pub const CENTRAL_DIRECTORY_MAGIC: [u8; 4] = [b'P', b'K', 1, 2];
/// Local file header magic number
pub const LOCAL_FILE_HEADER_MAGIC: [u8; 4] = [b'P', b'K', 3, 4];
/// Zip64 end of central directory locator magic number
pub const ZIP64_LOCATOR_MAGIC: [u8; 4] = [b'P', b'K', 6, 7];

/// The compression method used to store an entry
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompressionMethod {
    /// The entry is uncompressed
    None,
    /// The entry is [DEFLATE](https://en.wikipedia.org/wiki/DEFLATE)d.
    /// This is what nearly every JAR uses.
    Deflate,
    /// The entry is compressed with something we don't read.
    /// (The u16 is the format's method code.)
    Unsupported(u16),
}

impl CompressionMethod {
    pub(crate) fn from_u16(u: u16) -> Self {
        match u {
            0 => CompressionMethod::None,
            8 => CompressionMethod::Deflate,
            v => CompressionMethod::Unsupported(v),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::None => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unsupported(v) => v,
        }
    }
}

/// Extracts the "is this file encrypted?" bit from the 16-bit flags field.
pub(crate) fn is_encrypted(flags: u16) -> bool {
    // Bit 0: If set, indicates that the file is encrypted
    flags & 1 != 0
}

/// Extracts the "sizes and CRC follow the data" bit from the 16-bit flags field.
pub(crate) fn has_data_descriptor(flags: u16) -> bool {
    // Bit 3: If this bit is set, the fields crc-32, compressed
    //        size and uncompressed size are set to zero in the
    //        local header.  The correct values are put in the
    //        data descriptor immediately following the compressed
    //        data.
    flags & (1 << 3) != 0
}

/// Decodes an MS-DOS time and date, as stored in local and central headers.
///
/// Returns `None` for values that aren't a real date (zeroed fields, month 13, ...).
pub(crate) fn parse_msdos(time: u16, date: u16) -> Option<NaiveDateTime> {
    let seconds = (0b0000_0000_0001_1111 & time) as u32 * 2; // MSDOS uses 2-second precision
    let minutes = (0b0000_0111_1110_0000 & time) as u32 >> 5;
    let hours = (0b1111_1000_0000_0000 & time) as u32 >> 11;

    let days = (0b0000_0000_0001_1111 & date) as u32;
    let months = (0b0000_0001_1110_0000 & date) as u32 >> 5;
    // MSDOS uses years since 1980; Always interpreted as a positive value
    let years = ((0b1111_1110_0000_0000 & date) >> 9) as i32 + 1980;

    NaiveDate::from_ymd_opt(years, months, days)?.and_hms_opt(hours, minutes, seconds)
}

/// Data from a local file header
///
/// Each entry's actual contents are preceded by this header.
/// The central directory is authoritative for everything but the
/// name and extra field lengths, which we need to skip to find the data.
#[derive(Debug)]
pub struct LocalFileHeader<'a> {
    pub minimum_extract_version: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_modified_time: u16,
    pub last_modified_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub path: &'a [u8],
    pub extra_field: &'a [u8],
}

impl<'a> LocalFileHeader<'a> {
    pub const FIXED_SIZE: usize = 30;

    /// Parses the local header at the front of `header`.
    /// Returns it and its total size (fixed part plus name and extra field).
    pub fn parse(mut header: &'a [u8]) -> JarResult<(Self, usize)> {
        // 4.3.7  Local file header:
        //
        // local file header signature     4 bytes  (0x04034b50)
        // version needed to extract       2 bytes
        // general purpose bit flag        2 bytes
        // compression method              2 bytes
        // last mod file time              2 bytes
        // last mod file date              2 bytes
        // crc-32                          4 bytes
        // compressed size                 4 bytes
        // uncompressed size               4 bytes
        // file name length                2 bytes
        // extra field length              2 bytes
        //
        // file name (variable size)
        // extra field (variable size)
        if header.len() < Self::FIXED_SIZE {
            return Err(JarError::Malformed("Local file header runs past end of archive"));
        }
        if header[..4] != LOCAL_FILE_HEADER_MAGIC {
            return Err(JarError::Malformed("Invalid local file header"));
        }
        header = &header[4..];
        let minimum_extract_version = read_u16(&mut header);
        let flags = read_u16(&mut header);
        let compression_method = read_u16(&mut header);
        let last_modified_time = read_u16(&mut header);
        let last_modified_date = read_u16(&mut header);
        let crc32 = read_u32(&mut header);
        let compressed_size = read_u32(&mut header);
        let uncompressed_size = read_u32(&mut header);
        let path_length = read_u16(&mut header) as usize;
        let extra_field_length = read_u16(&mut header) as usize;
        if header.len() < path_length + extra_field_length {
            return Err(JarError::Malformed("Local file header runs past end of archive"));
        }
        let (path, remaining) = header.split_at(path_length);
        let (extra_field, _) = remaining.split_at(extra_field_length);

        Ok((
            Self {
                minimum_extract_version,
                flags,
                compression_method,
                last_modified_time,
                last_modified_date,
                crc32,
                compressed_size,
                uncompressed_size,
                path,
                extra_field,
            },
            Self::FIXED_SIZE + path_length + extra_field_length,
        ))
    }
}
