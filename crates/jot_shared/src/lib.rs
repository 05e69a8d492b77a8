//! # Jot Shared
//!
//! Types both ends of a Jot connection agree on:
//! - wire constants (header size, payload and string limits)
//! - the reserved control message table
//! - [`Vector2`], the quantized coordinate carried by the `vector` primitive

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;
pub mod protocol;

pub use constants::{
    DEFAULT_MAX_CONNECTIONS, DEFAULT_PING_INTERVAL_MS, DEFAULT_PORT, DEFAULT_TIMEOUT_MS,
    HEADER_SIZE, MAX_PAYLOAD_SIZE, MAX_STRING_LEN, RESERVED_TYPE_MAX,
};
pub use math::Vector2;
pub use protocol::{is_reserved, ControlMessage};
