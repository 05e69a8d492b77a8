//! Reserved control messages.
//!
//! Types `0..=9` are owned by the protocol. Only the three below are
//! assigned; the rest stay unassigned so they can be added later without
//! colliding with application traffic (`10..=255`).

use serde::{Deserialize, Serialize};

use crate::constants::RESERVED_TYPE_MAX;

/// Closed set of protocol-internal message types.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Server → peer liveness probe. Payload: `u64` timestamp (ms).
    Ping = 1,
    /// Peer → server probe answer. Payload: the echoed `u64` timestamp.
    Pong = 2,
    /// Error report. Payload: one `string`.
    Error = 3,
}

impl ControlMessage {
    /// Wire value of this message type.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Looks up an assigned control message.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ping),
            2 => Some(Self::Pong),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

impl From<ControlMessage> for u8 {
    fn from(message: ControlMessage) -> Self {
        message.as_u8()
    }
}

/// True for message types reserved to the protocol.
#[inline]
#[must_use]
pub const fn is_reserved(message_type: u8) -> bool {
    message_type <= RESERVED_TYPE_MAX
}
