//! Finding and parsing the End of central directory record.

use log::*;
use memchr::memmem;

use crate::codec::*;
use crate::data::ByteRange;
use crate::format::{EOCDR_MAGIC, ZIP64_LOCATOR_MAGIC};
use crate::result::*;

/// Size of the record, sans comment
const MINIMUM_SIZE: usize = 22;

/// The comment length is a u16, so the record can't start any further back than this.
const MAXIMUM_SIZE: usize = MINIMUM_SIZE + u16::MAX as usize;

/// Offset of the comment length field in the record
const COMMENT_LENGTH_OFFSET: usize = 20;

/// Size of the Zip64 end of central directory locator,
/// which sits right before the record in Zip64 archives
const ZIP64_LOCATOR_SIZE: usize = 20;

/// Data from the End of central directory record
///
/// Found at the back of the archive, it tells us where the central directory
/// is and how many records it holds, along with lots of stuff that stopped
/// being relevant when we stopped breaking ZIP archives onto multiple floppies.
///
/// A record is built for any source, however broken.
/// If no consistent record was found, [`is_valid()`](Self::is_valid) is false
/// and the other fields are zero. Check before using them!
#[derive(Debug, Clone, Default)]
pub struct CentralDirectoryEndRecord {
    valid: bool,
    /// Where the record itself sits in the source
    record_offset: u64,
    disk_number: u16,
    disk_with_central_directory: u16,
    entries_on_this_disk: u16,
    record_count: u32,
    central_directory_size: u64,
    /// Offset of the central directory, as stored (i.e., relative to the archive start)
    central_directory_offset: u64,
    /// Bytes of non-ZIP data before the archive proper
    start_of_archive: u64,
    comment: Vec<u8>,
    /// A Zip64 locator precedes the record
    zip64_locator: bool,
}

impl CentralDirectoryEndRecord {
    /// Searches backward from the end of `source` for the record.
    ///
    /// A signature only counts if the record's comment length reaches
    /// exactly to the end of the source, so the magic number showing up
    /// inside a comment doesn't fool us.
    pub fn new(source: &ByteRange) -> Self {
        let bytes = source.as_slice();
        if bytes.len() < MINIMUM_SIZE {
            debug!("{} bytes is too small for a ZIP archive", bytes.len());
            return Self::default();
        }

        let window_start = bytes.len().saturating_sub(MAXIMUM_SIZE);
        let window = &bytes[window_start..];
        for candidate in memmem::rfind_iter(window, &EOCDR_MAGIC) {
            let posit = window_start + candidate;
            let record = &bytes[posit..];
            let comment_length = match little_endian_value(record, COMMENT_LENGTH_OFFSET, 2) {
                Some(l) => l as usize,
                None => continue, // Too close to the end to be a whole record
            };
            if MINIMUM_SIZE + comment_length != record.len() {
                trace!("Skipping EOCDR signature at {posit} with inconsistent comment length");
                continue;
            }
            let zip64_locator = posit
                .checked_sub(ZIP64_LOCATOR_SIZE)
                .map_or(false, |l| bytes[l..].starts_with(&ZIP64_LOCATOR_MAGIC));
            return Self::parse(record, posit as u64, zip64_locator);
        }
        debug!("Couldn't find End Of Central Directory Record");
        Self::default()
    }

    fn parse(mut eocdr: &[u8], record_offset: u64, zip64_locator: bool) -> Self {
        // 4.3.16  End of central directory record:
        //
        // end of central dir signature    4 bytes  (0x06054b50)
        // number of this disk             2 bytes
        // number of the disk with the
        // start of the central directory  2 bytes
        // total number of entries in
        // the central dir on this disk    2 bytes
        // total number of entries in
        // the central dir                 2 bytes
        // size of the central directory   4 bytes
        // offset of start of central
        // directory with respect to
        // the starting disk number        4 bytes
        // zipfile comment length          2 bytes
        eocdr = &eocdr[4..];
        let disk_number = read_u16(&mut eocdr);
        let disk_with_central_directory = read_u16(&mut eocdr);
        let entries_on_this_disk = read_u16(&mut eocdr);
        let entries = read_u16(&mut eocdr);
        let central_directory_size = read_u32(&mut eocdr) as u64;
        let central_directory_offset = read_u32(&mut eocdr) as u64;
        let _comment_length = read_u16(&mut eocdr);
        let comment = eocdr.to_vec();

        // ZIP files can be prepended by arbitrary junk (a launcher script, say),
        // so the stored offset might not be the real one.
        // The difference between the two is where the archive starts.
        let start_of_archive = record_offset
            .checked_sub(central_directory_size)
            .and_then(|actual| actual.checked_sub(central_directory_offset));

        let record = Self {
            valid: start_of_archive.is_some(),
            record_offset,
            disk_number,
            disk_with_central_directory,
            entries_on_this_disk,
            record_count: entries as u32,
            central_directory_size,
            central_directory_offset,
            start_of_archive: start_of_archive.unwrap_or(0),
            comment,
            zip64_locator,
        };
        trace!("{:?}", record);
        if !record.valid {
            debug!("Central directory size or offset points before the start of the source");
        }
        record
    }

    /// True if a consistent record was found
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Number of central directory records the archive claims to have
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    pub fn central_directory_size(&self) -> u64 {
        self.central_directory_size
    }

    /// Offset of the central directory from the start of the archive
    /// (not the start of the source; see [`start_of_archive()`](Self::start_of_archive))
    pub fn central_directory_offset(&self) -> u64 {
        self.central_directory_offset
    }

    /// Number of bytes preceding the archive in its source
    pub fn start_of_archive(&self) -> u64 {
        self.start_of_archive
    }

    /// Offset of this record in its source
    pub fn record_offset(&self) -> u64 {
        self.record_offset
    }

    /// The archive comment
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Returns the central directory as a view into `source`
    /// (the same source this record was found in).
    pub fn central_directory(&self, source: &ByteRange) -> JarResult<ByteRange> {
        if !self.valid {
            return Err(JarError::Malformed(
                "Couldn't find End Of Central Directory Record",
            ));
        }
        source.subsection(
            self.start_of_archive + self.central_directory_offset,
            self.central_directory_size,
        )
    }

    /// Fails if the record describes something we don't read:
    /// multi-disk archives, or Zip64 archives.
    ///
    /// Zip64 archives put sentinel values (all ones) in the fields that
    /// overflow, but those are also legal values on their own:
    /// an archive can have exactly 65,535 entries.
    /// Only a Zip64 locator in front of the record makes them sentinels.
    pub(crate) fn check_supported(&self) -> JarResult<()> {
        if self.disk_number != self.disk_with_central_directory {
            return Err(JarError::UnsupportedArchive(format!(
                "No support for multi-disk archives: disk ({}) != disk with central directory ({})",
                self.disk_number, self.disk_with_central_directory
            )));
        }
        if self.record_count != self.entries_on_this_disk as u32 {
            return Err(JarError::UnsupportedArchive(format!(
                "No support for multi-disk archives: entries ({}) != entries this disk ({})",
                self.record_count, self.entries_on_this_disk
            )));
        }
        let has_sentinel = self.record_count == u16::MAX as u32
            || self.central_directory_size == u32::MAX as u64
            || self.central_directory_offset == u32::MAX as u64;
        if has_sentinel && self.zip64_locator {
            return Err(JarError::UnsupportedArchive(String::from(
                "No support for Zip64 archives",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// An EOCDR for an empty archive, with the given comment
    fn empty_eocdr(comment: &[u8]) -> Vec<u8> {
        let mut record = EOCDR_MAGIC.to_vec();
        record.extend_from_slice(&[0; 16]);
        record.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        record.extend_from_slice(comment);
        record
    }

    /// An EOCDR claiming `count` records in `size` bytes at `offset`
    fn eocdr(count: u16, size: u32, offset: u32) -> Vec<u8> {
        let mut record = EOCDR_MAGIC.to_vec();
        record.extend_from_slice(&[0; 4]); // disks
        record.extend_from_slice(&count.to_le_bytes());
        record.extend_from_slice(&count.to_le_bytes());
        record.extend_from_slice(&size.to_le_bytes());
        record.extend_from_slice(&offset.to_le_bytes());
        record.extend_from_slice(&0u16.to_le_bytes());
        record
    }

    #[test]
    fn empty_archive() {
        let record = CentralDirectoryEndRecord::new(&ByteRange::new(empty_eocdr(b"")));
        assert!(record.is_valid());
        assert_eq!(record.record_count(), 0);
        assert_eq!(record.start_of_archive(), 0);
        assert_eq!(record.record_offset(), 0);
        record.check_supported().unwrap();
    }

    #[test]
    fn comment_containing_magic() {
        // A decoy signature (with a plausible-looking tail) inside the comment
        let mut comment = b"hi ".to_vec();
        comment.extend_from_slice(&empty_eocdr(b""));
        comment.extend_from_slice(b" bye");
        let source = ByteRange::new(empty_eocdr(&comment));

        let record = CentralDirectoryEndRecord::new(&source);
        assert!(record.is_valid());
        assert_eq!(record.record_offset(), 0);
        assert_eq!(record.comment(), &comment[..]);
    }

    #[test]
    fn prefixed_archive() {
        // 100 bytes of "launcher script", a 46 byte "central directory",
        // then the EOCDR saying the directory is at 0 (relative to the archive)
        let mut bytes = vec![b'#'; 100];
        bytes.extend_from_slice(&[0; 46]);
        bytes.extend_from_slice(&eocdr(1, 46, 0));
        let source = ByteRange::new(bytes);

        let record = CentralDirectoryEndRecord::new(&source);
        assert!(record.is_valid());
        assert_eq!(record.record_offset(), 146);
        assert_eq!(record.start_of_archive(), 100);
        let directory = record.central_directory(&source).unwrap();
        assert_eq!(directory.root_offset(), 100);
        assert_eq!(directory.len(), 46);
    }

    #[test]
    fn offsets_before_the_source() {
        let record = CentralDirectoryEndRecord::new(&ByteRange::new(eocdr(1, 46, 10)));
        assert!(!record.is_valid());
        assert!(record.central_directory(&ByteRange::new(vec![])).is_err());
    }

    #[test]
    fn no_record() {
        for source in [
            vec![],
            vec![0; 21],
            vec![0; 1000],
            // Signature, but truncated
            EOCDR_MAGIC.to_vec(),
            // Signature, but comment length runs past the end
            empty_eocdr(b"abc")[..24].to_vec(),
        ] {
            let record = CentralDirectoryEndRecord::new(&ByteRange::new(source));
            assert!(!record.is_valid());
            assert_eq!(record.record_count(), 0);
        }
    }

    #[test]
    fn record_beyond_search_window() {
        // Trailing junk longer than any comment could be
        let mut bytes = empty_eocdr(b"");
        bytes.extend(std::iter::repeat(0).take(MAXIMUM_SIZE));
        let record = CentralDirectoryEndRecord::new(&ByteRange::new(bytes));
        assert!(!record.is_valid());
    }

    #[test]
    fn zip64_sentinels() {
        // Without a locator, all ones is just a big number.
        let mut bytes = vec![0; 100];
        bytes.extend_from_slice(&eocdr(u16::MAX, 0, 0));
        let record = CentralDirectoryEndRecord::new(&ByteRange::new(bytes));
        assert!(record.is_valid());
        assert_eq!(record.record_count(), 65535);
        record.check_supported().unwrap();

        // With one, it's a Zip64 archive.
        let mut bytes = vec![0; 80];
        bytes.extend_from_slice(&ZIP64_LOCATOR_MAGIC);
        bytes.extend_from_slice(&[0; ZIP64_LOCATOR_SIZE - 4]);
        bytes.extend_from_slice(&eocdr(u16::MAX, 0, 0));
        let record = CentralDirectoryEndRecord::new(&ByteRange::new(bytes));
        assert!(record.is_valid());
        assert!(matches!(
            record.check_supported(),
            Err(JarError::UnsupportedArchive(_))
        ));

        // A locator alone doesn't matter if the 32-bit fields hold real values.
        let mut bytes = vec![0; 80];
        bytes.extend_from_slice(&ZIP64_LOCATOR_MAGIC);
        bytes.extend_from_slice(&[0; ZIP64_LOCATOR_SIZE - 4]);
        bytes.extend_from_slice(&eocdr(3, 0, 0));
        let record = CentralDirectoryEndRecord::new(&ByteRange::new(bytes));
        record.check_supported().unwrap();
    }
}
