//! # Writer
//!
//! Sequential encoding into a pooled arena, with header-aware framing.
//!
//! ## Finalization
//!
//! ```text
//! [type][0x00 0x00] ── encoder runs ──▶ [type][len lo][len hi][payload...]
//!        ▲ placeholder                         ▲ patched: position - 3
//! ```

use std::rc::{Rc, Weak};

use jot_core::{Arena, ObjectPool, Poolable};
use jot_shared::{Vector2, HEADER_SIZE, MAX_STRING_LEN};

use crate::error::{EncodeOverflow, EncodeResult};

/// Pool of writers; nested writers are drawn from the same pool.
pub type WriterPool = ObjectPool<Writer>;

/// Pooled encoding cursor.
///
/// Every write either fits entirely and advances the position, or fails with
/// [`EncodeOverflow`] and leaves the arena and position untouched.
#[derive(Debug)]
pub struct Writer {
    /// Backing storage, reused across activations.
    arena: Arena,
    /// Next byte to write.
    position: usize,
    /// Pool that `nest` draws from. Dangling for standalone writers.
    pool: Weak<WriterPool>,
}

impl Writer {
    /// Creates a standalone writer with a full-size arena.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(Weak::new())
    }

    /// Creates a writer whose nested writers come from `pool`.
    #[must_use]
    pub fn with_pool(pool: Weak<WriterPool>) -> Self {
        Self {
            arena: Arena::new(),
            position: 0,
            pool,
        }
    }

    /// Creates a writer pool of `size` writers that nest through itself.
    #[must_use]
    pub fn new_pool(size: usize) -> Rc<WriterPool> {
        Rc::new_cyclic(|pool: &Weak<WriterPool>| {
            let pool = pool.clone();
            ObjectPool::new(move || Writer::with_pool(pool.clone()), size)
        })
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.position
    }

    /// True when nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Space left in the arena.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.arena.capacity() - self.position
    }

    /// The written bytes, `[0, position)`.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.arena.as_slice()[..self.position]
    }

    /// Fails without writing if `needed` bytes do not fit.
    fn reserve(&self, needed: usize) -> EncodeResult<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(EncodeOverflow::Capacity { needed, remaining });
        }
        Ok(())
    }

    /// Copies raw bytes in at the current position.
    pub fn bytes(&mut self, bytes: &[u8]) -> EncodeResult<&mut Self> {
        self.reserve(bytes.len())?;
        let end = self.position + bytes.len();
        self.arena.as_mut_slice()[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(self)
    }

    /// Encodes a bool as `1` or `0`.
    pub fn bool(&mut self, value: bool) -> EncodeResult<&mut Self> {
        self.u8(u8::from(value))
    }

    /// Encodes a `u8`.
    pub fn u8(&mut self, value: u8) -> EncodeResult<&mut Self> {
        self.bytes(&[value])
    }

    /// Encodes an `i8`.
    pub fn i8(&mut self, value: i8) -> EncodeResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    /// Encodes a little-endian `u16`.
    pub fn u16(&mut self, value: u16) -> EncodeResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    /// Encodes a little-endian `i16`.
    pub fn i16(&mut self, value: i16) -> EncodeResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    /// Encodes a little-endian `u32`.
    pub fn u32(&mut self, value: u32) -> EncodeResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    /// Encodes a little-endian `i32`.
    pub fn i32(&mut self, value: i32) -> EncodeResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    /// Encodes a little-endian `u64`.
    pub fn u64(&mut self, value: u64) -> EncodeResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    /// Encodes a little-endian `i64`.
    pub fn i64(&mut self, value: i64) -> EncodeResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    /// Encodes a [`Vector2`] as two `i16` tenths.
    ///
    /// Axes outside `-3276.7..=3276.7` are rejected, never clamped.
    pub fn vector(&mut self, value: Vector2) -> EncodeResult<&mut Self> {
        let axis = |v: f32| {
            Vector2::quantize_axis(v).ok_or(EncodeOverflow::VectorOutOfRange { value: v })
        };
        let [x0, x1] = axis(value.x)?.to_le_bytes();
        let [y0, y1] = axis(value.y)?.to_le_bytes();
        self.bytes(&[x0, x1, y0, y1])
    }

    /// Encodes a string behind a 1-byte length prefix.
    pub fn string(&mut self, value: &str) -> EncodeResult<&mut Self> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(EncodeOverflow::StringTooLong { len: bytes.len() });
        }
        self.reserve(1 + bytes.len())?;
        self.u8(bytes.len() as u8)?;
        self.bytes(bytes)
    }

    /// Encodes a `u16`-length sub-message built by `handler`.
    ///
    /// The sub-message is written into a second writer from the same pool,
    /// then copied in behind its length and the second writer is released.
    pub fn nest<F>(&mut self, handler: F) -> EncodeResult<&mut Self>
    where
        F: FnOnce(&mut Writer) -> EncodeResult<()>,
    {
        match self.pool.upgrade() {
            Some(pool) => {
                let mut nested = pool.acquire(());
                handler(&mut *nested)?;
                self.chunk(nested.as_bytes())
            }
            None => {
                let mut nested = Writer::new();
                handler(&mut nested)?;
                self.chunk(nested.as_bytes())
            }
        }
    }

    /// Writes `u16` length + bytes as one unit.
    fn chunk(&mut self, bytes: &[u8]) -> EncodeResult<&mut Self> {
        let len = u16::try_from(bytes.len()).map_err(|_| EncodeOverflow::Capacity {
            needed: bytes.len(),
            remaining: usize::from(u16::MAX),
        })?;
        self.reserve(2 + bytes.len())?;
        self.u16(len)?;
        self.bytes(bytes)
    }

    /// Encodes a complete frame and returns it.
    ///
    /// Writes the type and a zero length placeholder, runs `encode`, then
    /// patches the placeholder with the payload length.
    pub fn frame<F>(&mut self, message_type: u8, encode: F) -> EncodeResult<&[u8]>
    where
        F: FnOnce(&mut Writer) -> EncodeResult<()>,
    {
        self.position = 0;
        self.u8(message_type)?;
        self.u16(0)?;

        encode(self)?;

        // arena capacity (8192) keeps this within u16
        let payload_len = (self.position - HEADER_SIZE) as u16;
        self.arena.as_mut_slice()[1..HEADER_SIZE].copy_from_slice(&payload_len.to_le_bytes());

        Ok(self.as_bytes())
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Poolable for Writer {
    type Args<'a> = ();

    fn enable(&mut self, (): ()) {
        self.position = 0;
    }

    fn disable(&mut self) {}
}
