//! # Memory Management
//!
//! Pre-allocated arenas and object pools.
//!
//! ## Design Philosophy
//!
//! Cursor buffers are allocated once, when their pool is filled. After that:
//! - No heap allocations per message
//! - Retrieved objects are moved out of the pool, so they cannot alias
//! - Predictable, flat latency

mod arena;
mod pool;

pub use arena::{Arena, ARENA_CAPACITY};
pub use pool::{ObjectPool, Poolable, Pooled};
