//! # Jot Core
//!
//! Memory primitives shared by every Jot hot path:
//! - [`Arena`]: a fixed-capacity byte buffer that backs one wire cursor
//! - [`ObjectPool`]: a free-list of reusable objects with an explicit
//!   activation/deactivation lifecycle ([`Poolable`])
//!
//! ## Architecture Rules
//!
//! 1. **No per-message allocations** - cursors and sessions are recycled
//! 2. **Single-threaded** - pools use `RefCell` and are deliberately `!Sync`
//!
//! ## Example
//!
//! ```rust,ignore
//! use jot_core::{ObjectPool, Poolable};
//!
//! let pool = ObjectPool::new(MyCursor::new, 25);
//! let cursor = pool.acquire(());
//! // `cursor` goes back to the pool when dropped
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;

pub use memory::{Arena, ObjectPool, Poolable, Pooled, ARENA_CAPACITY};
