//! A cheap string type for entry names and comments.
//!
//! A large executable JAR can have tens of thousands of central directory
//! records. [`AsciiBytes`] lets us index all of them by name without
//! allocating a `String` apiece: it's a view into the central directory
//! that only decodes itself when someone asks for text.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};
use indexmap::Equivalent;

/// An immutable byte string, compared and hashed as the UTF-8 text it encodes.
///
/// Two values are equal (and hash equally) exactly when their decoded text is,
/// and a value hashes the same as that text's `str`.
/// That lets maps keyed by `AsciiBytes` be queried with plain `&str`s.
/// Invalid UTF-8 decodes lossily, with U+FFFD standing in for bad sequences.
#[derive(Clone, Default)]
pub struct AsciiBytes {
    bytes: Bytes,
    text: OnceLock<String>,
}

impl AsciiBytes {
    pub fn new<B: Into<Bytes>>(bytes: B) -> Self {
        Self {
            bytes: bytes.into(),
            text: OnceLock::new(),
        }
    }

    /// Length in bytes (not characters)
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn starts_with<B: AsRef<[u8]> + ?Sized>(&self, prefix: &B) -> bool {
        self.bytes.starts_with(prefix.as_ref())
    }

    pub fn ends_with<B: AsRef<[u8]> + ?Sized>(&self, suffix: &B) -> bool {
        self.bytes.ends_with(suffix.as_ref())
    }

    /// Returns a view of bytes `start..end`, sharing this value's storage.
    ///
    /// # Panics
    ///
    /// If `start > end` or `end > self.len()`, like slicing.
    pub fn substring(&self, start: usize, end: usize) -> AsciiBytes {
        Self::new(self.bytes.slice(start..end))
    }

    /// Returns a new value holding this one followed by `suffix`.
    pub fn append<B: AsRef<[u8]> + ?Sized>(&self, suffix: &B) -> AsciiBytes {
        let suffix = suffix.as_ref();
        if suffix.is_empty() {
            return self.clone();
        }
        let mut joined = BytesMut::with_capacity(self.len() + suffix.len());
        joined.extend_from_slice(&self.bytes);
        joined.extend_from_slice(suffix);
        Self::new(joined.freeze())
    }

    /// Decodes the bytes as text. The first call decodes; the rest are free.
    pub fn to_text(&self) -> &str {
        self.text.get_or_init(|| String::from_utf8_lossy(&self.bytes).into_owned())
    }

    /// The decoded text, without allocating when the bytes are valid UTF-8
    /// (i.e., nearly always).
    fn decoded(&self) -> Cow<'_, str> {
        match self.text.get() {
            Some(t) => Cow::Borrowed(t),
            None => String::from_utf8_lossy(&self.bytes),
        }
    }
}

impl PartialEq for AsciiBytes {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes || self.decoded() == other.decoded()
    }
}

impl Eq for AsciiBytes {}

impl PartialEq<str> for AsciiBytes {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes() || self.decoded() == other
    }
}

impl PartialEq<&str> for AsciiBytes {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl Hash for AsciiBytes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must match <str as Hash> for the decoded text.
        let decoded = self.decoded();
        let text: &str = &decoded;
        text.hash(state)
    }
}

/// Lets an `IndexMap<AsciiBytes, _>` be looked up by `&str`.
impl Equivalent<AsciiBytes> for str {
    fn equivalent(&self, key: &AsciiBytes) -> bool {
        *key == *self
    }
}

impl AsRef<[u8]> for AsciiBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<&str> for AsciiBytes {
    fn from(s: &str) -> Self {
        Self::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for AsciiBytes {
    fn from(s: String) -> Self {
        let bytes = Bytes::from(s.clone().into_bytes());
        Self {
            bytes,
            text: OnceLock::from(s),
        }
    }
}

impl From<Bytes> for AsciiBytes {
    fn from(b: Bytes) -> Self {
        Self::new(b)
    }
}

impl fmt::Display for AsciiBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decoded())
    }
}

impl fmt::Debug for AsciiBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.decoded(), f)
    }
}
