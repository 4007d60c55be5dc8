//! Little-endian integer decoding and a couple of bulk read helpers.

use std::io::{self, Read};

use bytes::Bytes;

use crate::data::ByteRange;
use crate::result::*;

/// Decodes the `width`-byte little-endian integer at `offset` in `bytes`.
///
/// `width` may be 2, 4, or 8. Returns `None` if the value would run past
/// the end of `bytes`.
pub fn little_endian_value(bytes: &[u8], offset: usize, width: usize) -> Option<u64> {
    let field = bytes.get(offset..offset.checked_add(width)?)?;
    match width {
        2 => Some(u16::from_le_bytes(field.try_into().ok()?) as u64),
        4 => Some(u32::from_le_bytes(field.try_into().ok()?) as u64),
        8 => Some(u64::from_le_bytes(field.try_into().ok()?)),
        _ => None,
    }
}

// Straight from the Rust docs.
// Callers check the length of what they're parsing up front,
// so running short here is a bug, not bad input.

/// Reads a little-endian u32 from the front of the provided slice, shrinking it.
pub fn read_u32(input: &mut &[u8]) -> u32 {
    let (int_bytes, rest) = input.split_at(std::mem::size_of::<u32>());
    *input = rest;
    u32::from_le_bytes(int_bytes.try_into().expect("less than four bytes for u32"))
}

/// Reads a little-endian u16 from the front of the provided slice, shrinking it.
pub fn read_u16(input: &mut &[u8]) -> u16 {
    let (int_bytes, rest) = input.split_at(std::mem::size_of::<u16>());
    *input = rest;
    u16::from_le_bytes(int_bytes.try_into().expect("less than two bytes for u16"))
}

/// Fills `buf` from `stream`, failing if the stream ends first.
pub fn fill<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("Stream ended after {} of {} bytes", filled, buf.len()),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Gets the whole of `source` as one contiguous buffer.
///
/// Our ranges already live in memory (mapped or not),
/// so this is a reference count bump rather than a copy.
pub fn read_all(source: &ByteRange) -> JarResult<Bytes> {
    Ok(source.as_bytes().clone())
}
