//! A single pass over the central directory, shared by any number of visitors.
//!
//! Building the name index, checking record counts, and whatever else a
//! caller wants to compute all need the same ordered sequence of headers.
//! Rather than walk the directory once per concern,
//! [`CentralDirectoryParser`] walks it once and hands each header to
//! every registered [`CentralDirectoryVisitor`].

use log::*;

use crate::codec::read_all;
use crate::data::ByteRange;
use crate::eocd::CentralDirectoryEndRecord;
use crate::format::{CENTRAL_DIRECTORY_MAGIC, LOCAL_FILE_HEADER_MAGIC};
use crate::header::FileHeader;
use crate::result::*;

/// Receives the contents of a central directory, in order.
///
/// Any error returned stops the parse and is passed back to its caller.
pub trait CentralDirectoryVisitor {
    /// Called once, before any headers
    fn visit_start(
        &mut self,
        _end_record: &CentralDirectoryEndRecord,
        _central_directory: &ByteRange,
    ) -> JarResult<()> {
        Ok(())
    }

    /// Called for each record, in directory order.
    ///
    /// `record_offset` is where the record starts in the central directory:
    /// the sum of the sizes of every record before it.
    fn visit_file_header(&mut self, header: &FileHeader, record_offset: usize) -> JarResult<()>;

    /// Called once, after the last header
    fn visit_end(&mut self) -> JarResult<()> {
        Ok(())
    }
}

/// Drives visitors over a source's central directory
#[derive(Default)]
pub struct CentralDirectoryParser<'v> {
    visitors: Vec<&'v mut dyn CentralDirectoryVisitor>,
}

impl<'v> CentralDirectoryParser<'v> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a visitor. Visitors are called in the order they're added.
    pub fn add_visitor(&mut self, visitor: &'v mut dyn CentralDirectoryVisitor) -> &mut Self {
        self.visitors.push(visitor);
        self
    }

    /// Parses the central directory of the archive in `source`,
    /// returning the archive proper: `source` minus any prefixed data,
    /// which is what every offset in the headers is relative to.
    ///
    /// If `validate_archive_start` is set, also check that the archive
    /// really starts where the End of central directory record says it does.
    pub fn parse(
        &mut self,
        source: &ByteRange,
        validate_archive_start: bool,
    ) -> JarResult<(ByteRange, CentralDirectoryEndRecord)> {
        let end_record = CentralDirectoryEndRecord::new(source);
        if !end_record.is_valid() {
            return Err(JarError::Malformed(
                "Couldn't find End Of Central Directory Record",
            ));
        }
        end_record.check_supported()?;

        let start = end_record.start_of_archive();
        let archive = source.subsection(start, source.len() - start)?;
        if start != 0 {
            debug!("Archive prepended with {start} bytes");
        }
        if validate_archive_start {
            check_archive_start(&archive, &end_record)?;
        }

        let central_directory = end_record.central_directory(source)?;
        for visitor in self.visitors.iter_mut() {
            visitor.visit_start(&end_record, &central_directory)?;
        }

        let directory = read_all(&central_directory)?;
        trace!(
            "{} entries at nominal offset {}",
            end_record.record_count(),
            end_record.central_directory_offset()
        );

        let mut offset = 0;
        for _ in 0..end_record.record_count() {
            if offset >= directory.len() {
                return Err(JarError::Malformed(
                    "Central directory has fewer records than its end record claims",
                ));
            }
            let header = FileHeader::load(&directory, offset)?;
            trace!("{:?}", header);
            for visitor in self.visitors.iter_mut() {
                visitor.visit_file_header(&header, offset)?;
            }
            offset += header.record_size();
        }

        if offset != directory.len() {
            if directory[offset..].starts_with(&CENTRAL_DIRECTORY_MAGIC) {
                return Err(JarError::Malformed(
                    "Central directory has more records than its end record claims",
                ));
            }
            warn!(
                "Ignoring {} unknown bytes at the end of the central directory",
                directory.len() - offset
            );
        }

        for visitor in self.visitors.iter_mut() {
            visitor.visit_end()?;
        }
        Ok((archive, end_record))
    }
}

/// Checks that the archive starts with a local file header,
/// or with the central directory if it has no entries.
fn check_archive_start(
    archive: &ByteRange,
    end_record: &CentralDirectoryEndRecord,
) -> JarResult<()> {
    let expected = if end_record.record_count() == 0 {
        if end_record.central_directory_size() == 0 {
            // Nothing but the end record.
            return Ok(());
        }
        &CENTRAL_DIRECTORY_MAGIC
    } else {
        &LOCAL_FILE_HEADER_MAGIC
    };
    if !archive.as_slice().starts_with(expected) {
        return Err(JarError::Malformed(
            "Archive doesn't start where its end record says it does",
        ));
    }
    Ok(())
}
