//! # Wire Protocol
//!
//! Length-prefixed binary frames and the pooled cursors that read and
//! write them.
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────────┬──────────────┬─────────────────────────────┐
//! │ type u8  │ length u16le │ payload                     │
//! └──────────┴──────────────┴─────────────────────────────┘
//!   0-9 control, 10-255 application
//! ```
//!
//! Nested sub-messages inside a payload are `u16le length | bytes`.

mod frame;
mod reader;
mod writer;

use std::rc::Rc;

use jot_core::ObjectPool;

pub use frame::{DecodeState, FrameDecoder, FrameEvent, FrameHeader};
pub use reader::Reader;
pub use writer::{Writer, WriterPool};

/// Reader and writer pools shared by every session of one server.
pub struct WirePools {
    /// Decoding cursors, one per in-flight inbound frame.
    pub readers: ObjectPool<Reader>,
    /// Encoding cursors; nested writers come from the same pool.
    pub writers: Rc<WriterPool>,
}

impl WirePools {
    /// Creates both pools, pre-filled.
    #[must_use]
    pub fn new(reader_pool_size: usize, writer_pool_size: usize) -> Self {
        Self {
            readers: ObjectPool::new(Reader::new, reader_pool_size),
            writers: Writer::new_pool(writer_pool_size),
        }
    }
}

impl std::fmt::Debug for WirePools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WirePools")
            .field("readers", &self.readers.available())
            .field("writers", &self.writers.available())
            .finish()
    }
}
