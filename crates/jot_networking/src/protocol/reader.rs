//! # Reader
//!
//! Sequential, bounds-checked decoding over a pooled arena.
//!
//! A reader only ever sees the bytes of the current message: [`Reader::header`]
//! narrows the bound to the announced payload, and [`Reader::nested`] narrows
//! it further for the duration of a sub-message handler.

use jot_core::{Arena, Poolable};
use jot_shared::{Vector2, HEADER_SIZE};

use super::frame::FrameHeader;
use crate::error::{DecodeError, DecodeResult};

/// Pooled decoding cursor.
///
/// `enable(bytes)` copies one frame into the reader's arena; the handler then
/// pulls primitives off the front. Every read either returns the value and
/// advances, or fails with [`DecodeError::OutOfBounds`] and leaves the
/// position untouched.
#[derive(Debug)]
pub struct Reader {
    /// Backing storage, reused across activations.
    arena: Arena,
    /// Bytes loaded by the last `enable`.
    len: usize,
    /// Next byte to read.
    position: usize,
    /// Reads may not go past this offset.
    bound: usize,
}

impl Reader {
    /// Creates an empty reader with a full-size arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            len: 0,
            position: 0,
            bound: 0,
        }
    }

    /// Creates a reader already bound to `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut reader = Self::new();
        reader.enable(bytes);
        reader
    }

    /// Current read offset.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left before the current bound.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bound - self.position
    }

    /// Reads the frame header and bounds the reader to its payload.
    ///
    /// A header announcing more bytes than were delivered is accepted here;
    /// the payload read that runs out fails instead.
    pub fn header(&mut self) -> DecodeResult<FrameHeader> {
        let message_type = self.u8()?;
        let payload_len = self.u16()?;
        self.bound = self.len.min(HEADER_SIZE + usize::from(payload_len));
        Ok(FrameHeader::new(message_type, payload_len))
    }

    /// Consumes `n` bytes.
    fn take(&mut self, n: usize) -> DecodeResult<&[u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(DecodeError::OutOfBounds {
                needed: n,
                remaining,
            });
        }
        let start = self.position;
        self.position += n;
        Ok(&self.arena.as_slice()[start..self.position])
    }

    /// Consumes exactly `N` bytes into an array.
    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Decodes a bool. Only the byte `1` is true.
    pub fn bool(&mut self) -> DecodeResult<bool> {
        Ok(self.u8()? == 1)
    }

    /// Decodes a `u8`.
    pub fn u8(&mut self) -> DecodeResult<u8> {
        Ok(u8::from_le_bytes(self.array()?))
    }

    /// Decodes an `i8`.
    pub fn i8(&mut self) -> DecodeResult<i8> {
        Ok(i8::from_le_bytes(self.array()?))
    }

    /// Decodes a little-endian `u16`.
    pub fn u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    /// Decodes a little-endian `i16`.
    pub fn i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    /// Decodes a little-endian `u32`.
    pub fn u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Decodes a little-endian `i32`.
    pub fn i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// Decodes a little-endian `u64`.
    pub fn u64(&mut self) -> DecodeResult<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Decodes a little-endian `i64`.
    pub fn i64(&mut self) -> DecodeResult<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    /// Decodes two `i16` tenths into a [`Vector2`].
    pub fn vector(&mut self) -> DecodeResult<Vector2> {
        let [x0, x1, y0, y1] = self.array::<4>()?;
        Ok(Vector2::new(
            Vector2::dequantize_axis(i16::from_le_bytes([x0, x1])),
            Vector2::dequantize_axis(i16::from_le_bytes([y0, y1])),
        ))
    }

    /// Decodes a 1-byte length prefixed UTF-8 string.
    pub fn string(&mut self) -> DecodeResult<&str> {
        let start = self.position;
        let len = usize::from(self.u8()?);
        let remaining = self.remaining();
        if len > remaining {
            self.position = start;
            return Err(DecodeError::OutOfBounds {
                needed: len,
                remaining,
            });
        }
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Consumes `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> DecodeResult<&[u8]> {
        self.take(n)
    }

    /// Decodes a `u16`-length sub-message with `handler`.
    ///
    /// While the handler runs, the reader is bounded to exactly the nested
    /// bytes. Afterwards the position moves past the whole sub-message, even
    /// if the handler left some of it unread.
    pub fn nested<T, F>(&mut self, handler: F) -> DecodeResult<T>
    where
        F: FnOnce(&mut Reader) -> DecodeResult<T>,
    {
        let start = self.position;
        let len = usize::from(self.u16()?);
        let remaining = self.remaining();
        if len > remaining {
            self.position = start;
            return Err(DecodeError::OutOfBounds {
                needed: len,
                remaining,
            });
        }

        let outer_bound = self.bound;
        let end = self.position + len;
        self.bound = end;

        let result = handler(self);

        self.bound = outer_bound;
        self.position = end;
        result
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Poolable for Reader {
    type Args<'a> = &'a [u8];

    fn enable(&mut self, bytes: &[u8]) {
        let capacity = self.arena.capacity();
        if bytes.len() > capacity {
            tracing::warn!(
                len = bytes.len(),
                capacity,
                "frame larger than reader arena, truncating"
            );
        }
        let len = bytes.len().min(capacity);
        self.arena.as_mut_slice()[..len].copy_from_slice(&bytes[..len]);
        self.len = len;
        self.position = 0;
        self.bound = len;
    }

    fn disable(&mut self) {}
}
