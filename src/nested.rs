//! `outer.jar!/lib/inner.jar!/...` paths
//!
//! Classloaders and other tooling address members of nested archives
//! by joining the path of the outermost archive and the name of each
//! nested entry with `!/`. [`NestedPath`] is that syntax, parsed.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

use crate::result::*;

/// Separates the segments of a nested path
pub const SEPARATOR: &str = "!/";

/// A file on disk, followed by zero or more entry names,
/// each naming a member of the archive before it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NestedPath {
    archive: Utf8PathBuf,
    entries: Vec<String>,
}

impl NestedPath {
    /// A path to the root of an archive, not nested in anything
    pub fn new<P: Into<Utf8PathBuf>>(archive: P) -> Self {
        Self {
            archive: archive.into(),
            entries: Vec::new(),
        }
    }

    /// The outermost archive's path on disk
    pub fn archive(&self) -> &Utf8Path {
        &self.archive
    }

    /// Names of entries, from outermost to innermost
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// How many archives deep this path goes
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Appends an entry name, descending one level.
    pub fn join<S: Into<String>>(&self, entry: S) -> Self {
        let mut joined = self.clone();
        joined.entries.push(entry.into());
        joined
    }

    /// The path one level up, or `None` for the root of an archive
    pub fn parent(&self) -> Option<Self> {
        let mut parent = self.clone();
        parent.entries.pop()?;
        Some(parent)
    }

    /// The innermost entry name, or `None` for the root of an archive
    pub fn entry_name(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}

impl FromStr for NestedPath {
    type Err = JarError;

    fn from_str(s: &str) -> JarResult<Self> {
        let mut segments = s.split(SEPARATOR);
        let archive = segments.next().unwrap_or_default();
        if archive.is_empty() {
            return Err(JarError::InvalidPath(format!("{s} names no archive")));
        }

        let mut entries: Vec<String> = segments.map(str::to_owned).collect();
        // "outer.jar!/" is the root of outer.jar
        if entries.last().map_or(false, |e| e.is_empty()) {
            entries.pop();
        }
        if entries.iter().any(|e| e.is_empty()) {
            return Err(JarError::InvalidPath(format!("{s} has an empty entry name")));
        }

        Ok(Self {
            archive: Utf8PathBuf::from(archive),
            entries,
        })
    }
}

impl fmt::Display for NestedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.archive)?;
        for entry in &self.entries {
            write!(f, "{SEPARATOR}{entry}")?;
        }
        Ok(())
    }
}
