//! Central directory file headers

use bytes::Bytes;
use chrono::NaiveDateTime;

use crate::ascii::AsciiBytes;
use crate::codec::*;
use crate::format::{self, CompressionMethod, CENTRAL_DIRECTORY_MAGIC};
use crate::result::*;

/// One record from the central directory
///
/// Each of these describes a file or folder stored in the archive.
/// The name, extra field, and comment are views into the central directory
/// they were parsed from; nothing is copied.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version_made_by: u16,
    pub minimum_extract_version: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_modified_time: u16,
    pub last_modified_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_number: u16,
    pub internal_file_attributes: u16,
    pub external_file_attributes: u32,
    /// Offset of the entry's local header, relative to the start of the archive
    pub local_header_offset: u32,
    pub name: AsciiBytes,
    pub extra: Bytes,
    pub comment: AsciiBytes,
}

impl FileHeader {
    /// Size of a record, sans name, extra field, and comment
    pub const FIXED_SIZE: usize = 46;

    /// Parses the record starting at `offset` in `buffer`
    /// (a whole central directory, usually).
    pub fn load(buffer: &Bytes, offset: usize) -> JarResult<Self> {
        // 4.3.12  Central directory structure:
        //
        //   central file header signature   4 bytes  (0x02014b50)
        //   version made by                 2 bytes
        //   version needed to extract       2 bytes
        //   general purpose bit flag        2 bytes
        //   compression method              2 bytes
        //   last mod file time              2 bytes
        //   last mod file date              2 bytes
        //   crc-32                          4 bytes
        //   compressed size                 4 bytes
        //   uncompressed size               4 bytes
        //   file name length                2 bytes
        //   extra field length              2 bytes
        //   file comment length             2 bytes
        //   disk number start               2 bytes
        //   internal file attributes        2 bytes
        //   external file attributes        4 bytes
        //   relative offset of local header 4 bytes
        //
        //   file name (variable size)
        //   extra field (variable size)
        //   file comment (variable size)
        let available = buffer.len().saturating_sub(offset);
        if available < Self::FIXED_SIZE {
            return Err(JarError::TruncatedRecord {
                offset,
                needed: Self::FIXED_SIZE,
                available,
            });
        }
        let mut entry = &buffer[offset..offset + Self::FIXED_SIZE];
        if entry[..4] != CENTRAL_DIRECTORY_MAGIC {
            return Err(JarError::Malformed("Invalid central directory file header"));
        }
        entry = &entry[4..];
        let version_made_by = read_u16(&mut entry);
        let minimum_extract_version = read_u16(&mut entry);
        let flags = read_u16(&mut entry);
        let compression_method = read_u16(&mut entry);
        let last_modified_time = read_u16(&mut entry);
        let last_modified_date = read_u16(&mut entry);
        let crc32 = read_u32(&mut entry);
        let compressed_size = read_u32(&mut entry);
        let uncompressed_size = read_u32(&mut entry);
        let name_length = read_u16(&mut entry) as usize;
        let extra_length = read_u16(&mut entry) as usize;
        let comment_length = read_u16(&mut entry) as usize;
        let disk_number = read_u16(&mut entry);
        let internal_file_attributes = read_u16(&mut entry);
        let external_file_attributes = read_u32(&mut entry);
        let local_header_offset = read_u32(&mut entry);

        let needed = Self::FIXED_SIZE + name_length + extra_length + comment_length;
        if available < needed {
            return Err(JarError::TruncatedRecord {
                offset,
                needed,
                available,
            });
        }
        let name_start = offset + Self::FIXED_SIZE;
        let extra_start = name_start + name_length;
        let comment_start = extra_start + extra_length;

        Ok(Self {
            version_made_by,
            minimum_extract_version,
            flags,
            compression_method,
            last_modified_time,
            last_modified_date,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_number,
            internal_file_attributes,
            external_file_attributes,
            local_header_offset,
            name: AsciiBytes::new(buffer.slice(name_start..extra_start)),
            extra: buffer.slice(extra_start..comment_start),
            comment: AsciiBytes::new(buffer.slice(comment_start..comment_start + comment_length)),
        })
    }

    /// Size of this record in the central directory;
    /// the next record starts this far after this one.
    pub fn record_size(&self) -> usize {
        Self::FIXED_SIZE + self.name.len() + self.extra.len() + self.comment.len()
    }

    pub fn method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.compression_method)
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with("/")
    }

    pub fn is_encrypted(&self) -> bool {
        format::is_encrypted(self.flags)
    }

    pub fn last_modified(&self) -> Option<NaiveDateTime> {
        format::parse_msdos(self.last_modified_time, self.last_modified_date)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(name: &[u8], extra: &[u8], comment: &[u8]) -> Vec<u8> {
        let mut bytes = CENTRAL_DIRECTORY_MAGIC.to_vec();
        bytes.extend_from_slice(&0x031eu16.to_le_bytes()); // made by Unix, 3.0
        bytes.extend_from_slice(&20u16.to_le_bytes());
        bytes.extend_from_slice(&(1u16 << 11).to_le_bytes()); // UTF-8 names
        bytes.extend_from_slice(&8u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // time
        bytes.extend_from_slice(&0x5021u16.to_le_bytes()); // 2020-01-01
        bytes.extend_from_slice(&0x12345678u32.to_le_bytes());
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // disk
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0o100644u32.wrapping_shl(16).to_le_bytes());
        bytes.extend_from_slice(&1234u32.to_le_bytes());
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(extra);
        bytes.extend_from_slice(comment);
        bytes
    }

    #[test]
    fn loads_fields_and_tails() {
        let mut bytes = vec![0xAA; 7]; // Junk before the record
        bytes.extend_from_slice(&record(b"test/entry.name", b"Extra", b"Hello"));
        let buffer = Bytes::from(bytes);

        let header = FileHeader::load(&buffer, 7).unwrap();
        assert_eq!(header.name, "test/entry.name");
        assert_eq!(&header.extra[..], b"Extra");
        assert_eq!(header.comment, "Hello");
        assert_eq!(header.record_size(), 46 + 15 + 5 + 5);
        assert_eq!(header.method(), CompressionMethod::Deflate);
        assert_eq!(header.crc32, 0x12345678);
        assert_eq!(header.compressed_size, 10);
        assert_eq!(header.uncompressed_size, 20);
        assert_eq!(header.local_header_offset, 1234);
        assert_eq!(header.version_made_by >> 8, 3);
        assert!(!header.is_directory());
        assert!(!header.is_encrypted());
        assert_eq!(
            header.last_modified().unwrap().to_string(),
            "2020-01-01 00:00:00"
        );
        // Views, not copies
        assert_eq!(header.name.as_bytes().as_ptr(), buffer[7 + 46..].as_ptr());
    }

    #[test]
    fn back_to_back_records() {
        let mut bytes = record(b"dir/", b"", b"");
        bytes.extend_from_slice(&record(b"dir/file", b"", b"c"));
        let buffer = Bytes::from(bytes);

        let first = FileHeader::load(&buffer, 0).unwrap();
        assert!(first.is_directory());
        let second = FileHeader::load(&buffer, first.record_size()).unwrap();
        assert_eq!(second.name, "dir/file");
        assert_eq!(first.record_size() + second.record_size(), buffer.len());
    }

    #[test]
    fn truncation() {
        let bytes = record(b"name", b"extra", b"comment");
        let buffer = Bytes::from(bytes[..bytes.len() - 1].to_vec());
        match FileHeader::load(&buffer, 0) {
            Err(JarError::TruncatedRecord {
                offset: 0,
                needed: 62,
                available: 61,
            }) => {}
            other => panic!("Expected truncation, got {:?}", other),
        }

        let buffer = Bytes::from(bytes[..45].to_vec());
        assert!(matches!(
            FileHeader::load(&buffer, 0),
            Err(JarError::TruncatedRecord { needed: 46, .. })
        ));
        assert!(matches!(
            FileHeader::load(&buffer, 100),
            Err(JarError::TruncatedRecord { available: 0, .. })
        ));
    }

    #[test]
    fn bad_signature() {
        let mut bytes = record(b"name", b"", b"");
        bytes[2] = 3;
        assert!(matches!(
            FileHeader::load(&Bytes::from(bytes), 0),
            Err(JarError::Malformed(_))
        ));
    }
}
