//! Builds small archives in memory for the tests to chew on.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

/// 2021-03-04 05:06:08, in MS-DOS format
pub const DOS_TIME: u16 = (5 << 11) | (6 << 5) | 4;
pub const DOS_DATE: u16 = ((2021 - 1980) << 9) | (3 << 5) | 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Stored,
    Deflated,
    /// Claim some other method, but store the bytes as-is
    Other(u16),
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub method: Method,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    /// Lie about the uncompressed size
    pub declared_size: Option<u32>,
    /// Lie about the CRC
    pub declared_crc: Option<u32>,
}

impl Entry {
    pub fn new(name: &str, data: &[u8], method: Method) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            method,
            extra: Vec::new(),
            comment: Vec::new(),
            declared_size: None,
            declared_crc: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct JarBuilder {
    prefix: Vec<u8>,
    entries: Vec<Entry>,
    comment: Vec<u8>,
    declared_records: Option<u16>,
}

impl JarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-ZIP bytes to put in front of the archive
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Lie about the number of records in the end record
    pub fn declare_records(mut self, count: u16) -> Self {
        self.declared_records = Some(count);
        self
    }

    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.entry(Entry::new(name, data, Method::Stored))
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.entry(Entry::new(name, data, Method::Deflated))
    }

    pub fn directory(self, name: &str) -> Self {
        self.stored(name, b"")
    }

    pub fn manifest(self, text: &str) -> Self {
        self.deflated("META-INF/MANIFEST.MF", text.as_bytes())
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.prefix.clone();
        let archive_start = out.len();
        let mut central = Vec::new();

        for entry in &self.entries {
            let (method, stored) = match entry.method {
                Method::Stored => (0, entry.data.clone()),
                Method::Deflated => (8, deflate(&entry.data)),
                Method::Other(m) => (m, entry.data.clone()),
            };
            let crc = entry
                .declared_crc
                .unwrap_or_else(|| crc32fast::hash(&entry.data));
            let size = entry.declared_size.unwrap_or(entry.data.len() as u32);
            let local_offset = (out.len() - archive_start) as u32;

            // Local file header
            out.extend_from_slice(b"PK\x03\x04");
            put16(&mut out, 20);
            put16(&mut out, 1 << 11);
            put16(&mut out, method);
            put16(&mut out, DOS_TIME);
            put16(&mut out, DOS_DATE);
            put32(&mut out, crc);
            put32(&mut out, stored.len() as u32);
            put32(&mut out, size);
            put16(&mut out, entry.name.len() as u16);
            put16(&mut out, entry.extra.len() as u16);
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(&entry.extra);
            out.extend_from_slice(&stored);

            // Central directory record
            central.extend_from_slice(b"PK\x01\x02");
            put16(&mut central, 0x031e);
            put16(&mut central, 20);
            put16(&mut central, 1 << 11);
            put16(&mut central, method);
            put16(&mut central, DOS_TIME);
            put16(&mut central, DOS_DATE);
            put32(&mut central, crc);
            put32(&mut central, stored.len() as u32);
            put32(&mut central, size);
            put16(&mut central, entry.name.len() as u16);
            put16(&mut central, entry.extra.len() as u16);
            put16(&mut central, entry.comment.len() as u16);
            put16(&mut central, 0);
            put16(&mut central, 0);
            put32(&mut central, 0o100644 << 16);
            put32(&mut central, local_offset);
            central.extend_from_slice(&entry.name);
            central.extend_from_slice(&entry.extra);
            central.extend_from_slice(&entry.comment);
        }

        let central_offset = (out.len() - archive_start) as u32;
        out.extend_from_slice(&central);

        let records = self.declared_records.unwrap_or(self.entries.len() as u16);
        out.extend_from_slice(b"PK\x05\x06");
        put16(&mut out, 0);
        put16(&mut out, 0);
        put16(&mut out, records);
        put16(&mut out, records);
        put32(&mut out, central.len() as u32);
        put32(&mut out, central_offset);
        put16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);
        out
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("Couldn't deflate into a Vec");
    encoder.finish().expect("Couldn't deflate into a Vec")
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Sets up logging for a test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
