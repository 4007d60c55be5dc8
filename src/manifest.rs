//! Parsing `META-INF/MANIFEST.MF`
//!
//! A manifest is a series of sections separated by blank lines.
//! The first is the main section; each after it starts with a `Name:`
//! attribute naming the entry it describes. Every line is a `Key: Value`
//! pair, and lines starting with a single space continue the previous value
//! (writers wrap at 72 bytes).

use indexmap::IndexMap;

use crate::result::*;

/// Where manifests live
pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

/// The attributes of one manifest section, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(IndexMap<String, String>);

impl Attributes {
    /// Looks up an attribute. Like the JAR format says, names are
    /// compared case-insensitively (ASCII only).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, name: String, value: String) {
        // A repeated attribute replaces the earlier one.
        let existing = self
            .0
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&name))
            .cloned();
        match existing {
            Some(k) => {
                self.0.insert(k, value);
            }
            None => {
                self.0.insert(name, value);
            }
        }
    }
}

/// A parsed JAR manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    entries: IndexMap<String, Attributes>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> JarResult<Self> {
        let text = std::str::from_utf8(bytes)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut manifest = Manifest::default();
        for section in sections(text)? {
            if manifest.main.is_empty() && manifest.entries.is_empty() && !is_entry(&section) {
                manifest.main = section;
                continue;
            }
            let name = section
                .get("Name")
                .ok_or_else(|| {
                    JarError::InvalidManifest(String::from(
                        "Per-entry section without a Name attribute",
                    ))
                })?
                .to_owned();
            manifest.entries.insert(name, section);
        }
        Ok(manifest)
    }

    /// The main section's attributes
    pub fn main_attributes(&self) -> &Attributes {
        &self.main
    }

    /// Shorthand for `main_attributes().get(name)`
    pub fn main_attribute(&self, name: &str) -> Option<&str> {
        self.main.get(name)
    }

    /// The attributes of the section for the named entry, if there is one
    pub fn entry_attributes(&self, name: &str) -> Option<&Attributes> {
        self.entries.get(name)
    }

    /// Names of the entries with their own sections
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn is_entry(section: &Attributes) -> bool {
    section.0.keys().next().map_or(false, |k| k.eq_ignore_ascii_case("Name"))
}

/// Splits a manifest into its (non-empty) sections
fn sections(text: &str) -> JarResult<Vec<Attributes>> {
    let mut sections = Vec::new();
    let mut current = Attributes::default();
    // The attribute we're building, which continuation lines add to
    let mut pending: Option<(String, String)> = None;

    // Manifests may use CRLF, LF, or lone CR line endings.
    for line in text.split("\r\n").flat_map(|l| l.split(['\r', '\n'])) {
        if let Some(continuation) = line.strip_prefix(' ') {
            match pending.as_mut() {
                Some((_, value)) => value.push_str(continuation),
                None => {
                    return Err(JarError::InvalidManifest(String::from(
                        "Continuation line without an attribute to continue",
                    )))
                }
            }
            continue;
        }

        if let Some((name, value)) = pending.take() {
            current.insert(name, value);
        }

        if line.is_empty() {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            continue;
        }

        let (name, value) = line.split_once(": ").ok_or_else(|| {
            JarError::InvalidManifest(format!("Expected \"Name: Value\", got \"{line}\""))
        })?;
        if name.is_empty() {
            return Err(JarError::InvalidManifest(format!(
                "Attribute with no name in \"{line}\""
            )));
        }
        pending = Some((name.to_owned(), value.to_owned()));
    }

    if let Some((name, value)) = pending {
        current.insert(name, value);
    }
    if !current.is_empty() {
        sections.push(current);
    }
    Ok(sections)
}
