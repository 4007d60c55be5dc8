//! nestjar reads executable JARs and the JARs packed inside them,
//! to any depth, without unpacking anything to disk:
//!
//! ```no_run
//! # use nestjar::*;
//! // Memory-map the outer archive...
//! let app = JarFile::open("app.jar")?;
//! println!("Main-Class: {:?}", app.manifest()?.and_then(|m| m.main_attribute("Main-Class")));
//!
//! // ...and open one inside it.
//! let lib = app.nested_jar_by_name("BOOT-INF/lib/library.jar")?;
//! for entry in lib.entries() {
//!     println!("{} ({} bytes)", entry.name(), entry.size());
//! }
//!
//! // Or go straight there with a nested path.
//! let path: NestedPath = "app.jar!/BOOT-INF/lib/library.jar".parse()?;
//! let same_lib = JarFile::open_nested(&path)?;
//! let class = same_lib.entry("com/example/Thing.class")?.read_to_vec()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! A ZIP archive's directory sits at its end, and each member is compressed
//! independently, with the directory telling us where to find it.
//! So if a JAR is _stored_ (not compressed) inside another,
//! its bytes are right there in the outer file, and we can read it in place:
//! every nested archive is a view onto the outermost archive's memory map.
//! (Deflated nested archives are inflated into memory, since there's no
//! other way to get at them.)
//!
//! Views share the map by reference count, so the file stays mapped until
//! the last archive, entry, or stream using it is dropped.
//! Nothing needs to be closed in any particular order.
//!
//! Everything here is read-only and immutable once built,
//! so archives and entries can be shared between threads freely.

pub mod ascii;
pub mod codec;
pub mod data;
pub mod entry;
pub mod eocd;
pub mod format;
pub mod header;
pub mod manifest;
pub mod nested;
pub mod parser;
pub mod read;
pub mod result;

pub use ascii::AsciiBytes;
pub use data::{ByteRange, ReadMode};
pub use entry::JarEntry;
pub use format::CompressionMethod;
pub use manifest::Manifest;
pub use nested::NestedPath;
pub use read::JarFile;
pub use result::{JarError, JarResult};

mod arch;
mod crc_reader;
