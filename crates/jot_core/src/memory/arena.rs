//! # Byte Arena
//!
//! A fixed-capacity byte buffer owned by exactly one cursor.

/// Capacity of every cursor arena, in bytes.
///
/// This bounds a single frame: 3 header bytes plus at most 8189 payload bytes.
pub const ARENA_CAPACITY: usize = 8192;

/// A fixed-capacity, heap-backed byte buffer.
///
/// The storage is allocated once in [`Arena::new`] and never resized.
/// Cursors keep their own position; the arena only hands out slices.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = Arena::new();
/// arena.as_mut_slice()[0] = 0xff;
/// assert_eq!(arena.capacity(), ARENA_CAPACITY);
/// ```
pub struct Arena {
    /// The backing storage.
    storage: Box<[u8]>,
}

impl Arena {
    /// Creates a zeroed arena of [`ARENA_CAPACITY`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(ARENA_CAPACITY)
    }

    /// Creates a zeroed arena with a custom capacity in bytes.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Total size in bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the whole buffer.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage
    }

    /// Returns the whole buffer mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
