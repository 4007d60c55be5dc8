//! Tools for reading a JAR (or any ZIP archive), and the archives inside it.
//!
//! To start reading, open a [`JarFile`] from a file or a buffer.
//!
//! [`JarFile`]: struct.JarFile.html

use std::sync::OnceLock;

use camino::Utf8Path;
use indexmap::{map, IndexMap};
use log::*;

use crate::ascii::AsciiBytes;
use crate::data::ByteRange;
use crate::entry::JarEntry;
use crate::eocd::CentralDirectoryEndRecord;
use crate::header::FileHeader;
use crate::manifest::{Manifest, MANIFEST_NAME};
use crate::nested::NestedPath;
use crate::parser::{CentralDirectoryParser, CentralDirectoryVisitor};
use crate::result::*;

/// An archive, indexed by entry name
///
/// The index is built once, when the archive is opened,
/// and never changes afterward. Opening fails if the archive's
/// directory structure is broken; problems with individual entries' data
/// only come up when you read those entries.
///
/// `JarFile`s are `Send` and `Sync`, as are their entries.
pub struct JarFile {
    /// Where this archive is: a file, or an entry in some other archive
    location: NestedPath,
    /// The archive's bytes, minus anything prepended to it
    data: ByteRange,
    end_record: CentralDirectoryEndRecord,
    /// Entries by name, in central directory order
    entries: IndexMap<AsciiBytes, JarEntry>,
    manifest: OnceLock<Option<Manifest>>,
}

impl JarFile {
    /// Reads an archive from the given bytes.
    ///
    /// ```no_run
    /// # use nestjar::*;
    /// let bytes = std::fs::read("app.jar")?;
    /// let jar = JarFile::new(ByteRange::new(bytes))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// Arbitrary data (a launcher script, say) may precede the archive.
    pub fn new(data: ByteRange) -> JarResult<Self> {
        Self::with_location(data, NestedPath::new(""))
    }

    /// Memory-maps and reads the archive at `path`.
    ///
    /// ```no_run
    /// # use nestjar::*;
    /// let jar = JarFile::open("app.jar")?;
    /// let inner = jar.nested_jar_by_name("BOOT-INF/lib/inner.jar")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> JarResult<Self> {
        let path = path.as_ref();
        Self::with_location(ByteRange::open(path)?, NestedPath::new(path))
    }

    /// Opens the archive a [`NestedPath`] names,
    /// descending through each of its entries from the outermost archive.
    pub fn open_nested(path: &NestedPath) -> JarResult<Self> {
        let mut jar = Self::open(path.archive())?;
        for entry in path.entries() {
            jar = jar.nested_jar_by_name(entry)?;
        }
        Ok(jar)
    }

    fn with_location(source: ByteRange, location: NestedPath) -> JarResult<Self> {
        // Only check where the outermost archive starts.
        // Nested ones were found via their parent's (validated) directory.
        let validate_start = location.depth() == 0;

        let mut index = EntryIndex::default();
        let (data, end_record) = CentralDirectoryParser::new()
            .add_visitor(&mut index)
            .parse(&source, validate_start)?;

        let entries: IndexMap<AsciiBytes, JarEntry> = index
            .headers
            .into_iter()
            .map(|(name, header)| (name, JarEntry::new(header, data.clone())))
            .collect();
        debug!("Indexed {} entries in {}", entries.len(), location);

        Ok(Self {
            location,
            data,
            end_record,
            entries,
            manifest: OnceLock::new(),
        })
    }

    /// Where this archive is
    pub fn location(&self) -> &NestedPath {
        &self.location
    }

    /// The archive's bytes, not including any data prepended to it
    pub fn data(&self) -> &ByteRange {
        &self.data
    }

    pub fn end_record(&self) -> &CentralDirectoryEndRecord {
        &self.end_record
    }

    /// The archive comment
    pub fn comment(&self) -> &[u8] {
        self.end_record.comment()
    }

    /// Number of (uniquely named) entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in central directory order.
    ///
    /// If several entries share a name, only the first is here.
    pub fn entries(&self) -> map::Values<'_, AsciiBytes, JarEntry> {
        self.entries.values()
    }

    /// Looks up an entry by name.
    pub fn get_entry(&self, name: &str) -> Option<&JarEntry> {
        self.entries.get(name)
    }

    /// Looks up an entry by name, failing with
    /// [`JarError::EntryNotFound`] if there isn't one.
    pub fn entry(&self, name: &str) -> JarResult<&JarEntry> {
        self.get_entry(name)
            .ok_or_else(|| JarError::EntryNotFound(name.to_owned()))
    }

    /// Returns the archive's manifest, or `None` if it doesn't have one.
    ///
    /// The manifest is parsed the first time it's asked for.
    pub fn manifest(&self) -> JarResult<Option<&Manifest>> {
        if let Some(manifest) = self.manifest.get() {
            return Ok(manifest.as_ref());
        }
        let manifest = match self.get_entry(MANIFEST_NAME) {
            Some(entry) => Some(Manifest::parse(entry.contents()?.as_slice())?),
            None => None,
        };
        Ok(self.manifest.get_or_init(|| manifest).as_ref())
    }

    /// Opens an entry of this archive as an archive in its own right.
    ///
    /// Stored entries are viewed in place, sharing this archive's bytes;
    /// deflated ones have to be inflated into memory first.
    /// Either way, the new archive keeps those bytes alive as long as it lives,
    /// even if this archive is dropped.
    pub fn nested_jar(&self, entry: &JarEntry) -> JarResult<JarFile> {
        let location = self.location.join(entry.name().to_text());
        debug!("Opening nested archive {}", location);
        Self::with_location(entry.contents()?, location)
    }

    /// Shorthand for `nested_jar(entry(name)?)`
    pub fn nested_jar_by_name(&self, name: &str) -> JarResult<JarFile> {
        self.nested_jar(self.entry(name)?)
    }
}

impl std::fmt::Debug for JarFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JarFile")
            .field("location", &self.location)
            .field("data", &self.data)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Builds the name index as the central directory is parsed
#[derive(Default)]
struct EntryIndex {
    expected: u32,
    seen: u32,
    headers: IndexMap<AsciiBytes, FileHeader>,
}

impl CentralDirectoryVisitor for EntryIndex {
    fn visit_start(
        &mut self,
        end_record: &CentralDirectoryEndRecord,
        _central_directory: &ByteRange,
    ) -> JarResult<()> {
        self.expected = end_record.record_count();
        self.headers.reserve(self.expected as usize);
        Ok(())
    }

    fn visit_file_header(&mut self, header: &FileHeader, _record_offset: usize) -> JarResult<()> {
        self.seen += 1;
        match self.headers.entry(header.name.clone()) {
            map::Entry::Occupied(_) => {
                // First one wins, like most ZIP readers.
                warn!("Ignoring duplicate entry for {}", header.name);
            }
            map::Entry::Vacant(slot) => {
                slot.insert(header.clone());
            }
        }
        Ok(())
    }

    fn visit_end(&mut self) -> JarResult<()> {
        if self.seen != self.expected {
            return Err(JarError::Malformed(
                "Central directory record count doesn't match its end record",
            ));
        }
        Ok(())
    }
}
