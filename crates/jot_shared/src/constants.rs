//! # Wire & Server Constants
//!
//! **CRITICAL:** wire limits are part of the protocol. Changing them breaks
//! every deployed client.

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Frame header: 1 type byte + 2 little-endian length bytes.
pub const HEADER_SIZE: usize = 3;

/// Capacity of one cursor arena. A whole frame must fit.
pub const FRAME_CAPACITY: usize = 8192;

/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD_SIZE: usize = FRAME_CAPACITY - HEADER_SIZE;

/// Strings carry a 1-byte length prefix.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Message types `0..=RESERVED_TYPE_MAX` belong to the protocol itself.
pub const RESERVED_TYPE_MAX: u8 = 9;

/// Fixed-point scale of the `vector` primitive (one decimal place).
pub const VECTOR_SCALE: f32 = 10.0;

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 1337;

/// Default connection cap enforced at accept time.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Default interval between heartbeat pings, in milliseconds.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 5000;

/// Default time a peer has to answer a ping, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
