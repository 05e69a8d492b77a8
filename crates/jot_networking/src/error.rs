//! # Networking Error Types
//!
//! Codec failures are caught at the session boundary and reported through
//! the session's error path; none of them may take the process down.

use thiserror::Error;

/// A read needed more bytes than its bound region holds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Read past the end of the current message or nested region.
    #[error("read of {needed} bytes exceeds the {remaining} remaining in message")]
    OutOfBounds {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left before the bound.
        remaining: usize,
    },

    /// A `string` field did not hold valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
}

/// A write would not fit the arena or the field's wire representation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeOverflow {
    /// Write past arena capacity.
    #[error("write of {needed} bytes exceeds the {remaining} remaining in arena")]
    Capacity {
        /// Bytes the write required.
        needed: usize,
        /// Bytes left before capacity.
        remaining: usize,
    },

    /// String longer than its 1-byte length prefix allows.
    #[error("string of {len} bytes exceeds the 255 byte limit")]
    StringTooLong {
        /// UTF-8 byte length of the rejected string.
        len: usize,
    },

    /// Vector axis outside `-3276.7..=3276.7` (or not finite).
    #[error("vector axis {value} is outside the encodable range")]
    VectorOutOfRange {
        /// The rejected axis value.
        value: f32,
    },
}

/// Everything the session error path can report.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Inbound payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Outbound payload could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeOverflow),

    /// The transport reported a failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A frame header announced more payload than an arena can hold.
    #[error("frame of type {message_type} announces {payload_len} payload bytes (max {max})")]
    FrameTooLarge {
        /// Type byte of the rejected frame.
        message_type: u8,
        /// Announced payload length.
        payload_len: usize,
        /// Largest accepted payload.
        max: usize,
    },

    /// The peer sent an `Error` control message.
    #[error("peer reported: {0}")]
    Peer(String),

    /// Send attempted on a session that is no longer active.
    #[error("session is not connected")]
    NotConnected,

    /// A message handler rejected its payload.
    #[error("{0}")]
    Handler(String),
}

/// Result type for cursor reads.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for cursor writes.
pub type EncodeResult<T> = Result<T, EncodeOverflow>;
