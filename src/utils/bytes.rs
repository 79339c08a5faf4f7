//! Byte-slice utilities for bounds-oriented parsing.
//!
//! There are two layers:
//! - **Option layer** (`read_*`): zero-cost helpers that return `Option<T>`.
//! - **Result layer** (`*_r`): wrappers that map `None` to `PayloadError::Truncated`.
//!
//! All numeric reads are **big-endian**; every integer in the payload container header is
//! stored most significant byte first. Offsets are `usize` and relative to the slice passed in.

use byteorder::{BigEndian, ByteOrder};

use crate::err::PayloadError;

/// Read `N` raw bytes at `offset`.
///
/// Returns `None` if the range is out of bounds.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

/// Read a `u16` (big-endian) at `offset`.
pub(crate) fn read_u16_be(buf: &[u8], offset: usize) -> Option<u16> {
    Some(BigEndian::read_u16(&read_array::<2>(buf, offset)?))
}

/// Read a `u32` (big-endian) at `offset`.
pub(crate) fn read_u32_be(buf: &[u8], offset: usize) -> Option<u32> {
    Some(BigEndian::read_u32(&read_array::<4>(buf, offset)?))
}

/// Read a `u64` (big-endian) at `offset`.
pub(crate) fn read_u64_be(buf: &[u8], offset: usize) -> Option<u64> {
    Some(BigEndian::read_u64(&read_array::<8>(buf, offset)?))
}

#[inline]
pub(crate) fn truncated(
    what: &'static str,
    offset: usize,
    need: usize,
    len: usize,
) -> PayloadError {
    PayloadError::Truncated {
        what,
        offset: offset as u64,
        need,
        have: len.saturating_sub(offset),
    }
}

pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], PayloadError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))
}

/// Read a `u16` (big-endian) at `offset`, or return `PayloadError::Truncated`.
pub(crate) fn read_u16_be_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u16, PayloadError> {
    read_u16_be(buf, offset).ok_or_else(|| truncated(what, offset, 2, buf.len()))
}

/// Read a `u32` (big-endian) at `offset`, or return `PayloadError::Truncated`.
pub(crate) fn read_u32_be_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u32, PayloadError> {
    read_u32_be(buf, offset).ok_or_else(|| truncated(what, offset, 4, buf.len()))
}

/// Read a `u64` (big-endian) at `offset`, or return `PayloadError::Truncated`.
pub(crate) fn read_u64_be_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u64, PayloadError> {
    read_u64_be(buf, offset).ok_or_else(|| truncated(what, offset, 8, buf.len()))
}
