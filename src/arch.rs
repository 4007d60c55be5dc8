use crate::result::*;

/// A checked cast to usize
///
/// Offsets and sizes are carried around as u64 (that's what the format
/// and [`ByteRange`](crate::data::ByteRange) speak),
/// but slicing needs a usize.
pub fn usize<I: Into<u64>>(i: I) -> JarResult<usize> {
    let i: u64 = i.into();
    usize::try_from(i).map_err(|_| JarError::InsufficientAddressSpace)
}
