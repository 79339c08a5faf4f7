use std::borrow::Cow;

use crate::err::{PayloadError, Result};
use crate::utils::bytes;

/// A lightweight cursor over an immutable byte slice.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`, intended for parsing where:
/// - the whole payload is already in memory, and
/// - we want explicit bounds/offset control without IO-style error plumbing.
///
/// All reads are big-endian and advance the cursor only on success, so `pos` never exceeds the
/// buffer length and never moves backwards.
#[derive(Clone, Copy, Debug)]
pub struct PayloadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Borrow exactly `len` bytes and advance past them.
    #[inline]
    pub fn take_bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    /// Read `len` bytes as text, for comparing against ASCII tags such as the container magic.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; callers compare the result, they don't
    /// trust it.
    pub fn ascii_tag(&mut self, len: usize, what: &'static str) -> Result<Cow<'a, str>> {
        let raw = self.take_bytes(len, what)?;
        Ok(String::from_utf8_lossy(raw))
    }

    #[inline]
    pub fn u16_named(&mut self, what: &'static str) -> Result<u16> {
        let v = bytes::read_u16_be_r(self.buf, self.pos, what)?;
        self.pos += 2;
        Ok(v)
    }

    #[inline]
    pub fn u32_named(&mut self, what: &'static str) -> Result<u32> {
        let v = bytes::read_u32_be_r(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }

    #[inline]
    pub fn u64_named(&mut self, what: &'static str) -> Result<u64> {
        let v = bytes::read_u64_be_r(self.buf, self.pos, what)?;
        self.pos += 8;
        Ok(v)
    }

    /// Read a `size`-byte unsigned integer, widened to `u64`.
    ///
    /// Only the widths used by the container (2, 4 and 8) are accepted.
    pub fn read_uint(&mut self, size: usize, what: &'static str) -> Result<u64> {
        match size {
            2 => self.u16_named(what).map(u64::from),
            4 => self.u32_named(what).map(u64::from),
            8 => self.u64_named(what),
            _ => Err(PayloadError::InvalidIntegerWidth {
                what,
                offset: self.position(),
                size,
            }),
        }
    }
}
