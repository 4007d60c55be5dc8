//! Error types and the related `Result<T>`

use thiserror::Error;

pub type JarResult<T> = Result<T, JarError>;

#[derive(Debug, Error)]
pub enum JarError {
    /// An error from underlying I/O
    #[error("I/O Error")]
    Io(#[from] std::io::Error),

    /// The archive's directory structure is missing or inconsistent:
    /// no End of central directory record, a bad signature,
    /// or a record count that doesn't match the records present.
    #[error("Malformed archive: {0}")]
    Malformed(&'static str),

    /// A central directory record declared variable-length fields
    /// running past the end of the directory.
    #[error("Truncated central directory record at offset {offset}: needs {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// No entry in the archive has the requested name
    #[error("No entry in the archive named {0}")]
    EntryNotFound(String),

    /// The entry is compressed with something other than STORE or DEFLATE.
    /// Only raised when that entry's data is requested.
    #[error("Entry {name} uses unsupported compression method {method}")]
    UnsupportedCompression { name: String, method: u16 },

    /// An entry's data came up short of its declared size.
    #[error("Entry {name} declares {expected} bytes but only {actual} are available")]
    TruncatedData {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// An entry's data doesn't match the CRC-32 in its header
    #[error("Entry {0} failed its CRC-32 check")]
    InvalidChecksum(String),

    /// The archive uses a feature we don't read (Zip64, multiple disks, encryption)
    #[error("Unsupported archive: {0}")]
    UnsupportedArchive(String),

    /// A read or subsection went past the end of its byte range
    #[error("Range {offset}..{offset}+{length} is outside a source of {size} bytes")]
    OutOfRange { offset: u64, length: u64, size: u64 },

    /// Decoding UTF-8 text (e.g., a manifest) failed
    #[error("Invalid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    /// `META-INF/MANIFEST.MF` isn't in the `Key: Value` format
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// A `outer.jar!/inner.jar` style path couldn't be parsed
    #[error("Invalid nested path: {0}")]
    InvalidPath(String),

    /// A cast from a 64-bit int to a usize failed,
    /// probably on a 32-bit system.
    #[error("Archive too large for address space")]
    InsufficientAddressSpace,
}
