//! # Session Lifecycle Events
//!
//! Lifecycle notifications fan out to every registered listener. Payload
//! dispatch is a separate mechanism: one handler per message type, see
//! [`Session::register`](super::Session::register).

use std::fmt;

use super::SessionId;
use crate::error::SessionError;

/// Why a session ended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Nothing recorded yet.
    #[default]
    Unknown,
    /// The peer closed its end.
    UserEnded,
    /// The transport reported an error.
    SocketError,
    /// A ping went unanswered.
    TimedOut,
    /// Application-supplied reason passed to `kick`.
    Custom(String),
}

impl DisconnectReason {
    /// True until a reason has been recorded.
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Human-readable form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "unknown",
            Self::UserEnded => "user ended",
            Self::SocketError => "socket error",
            Self::TimedOut => "timed out",
            Self::Custom(reason) => reason,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DisconnectReason {
    fn from(reason: &str) -> Self {
        Self::Custom(reason.to_owned())
    }
}

impl From<String> for DisconnectReason {
    fn from(reason: String) -> Self {
        Self::Custom(reason)
    }
}

/// `(session, message type, frame bytes)` for each frame sent or received.
pub type TrafficListener = Box<dyn FnMut(SessionId, u8, usize)>;

/// `(session, reason)` once the session has closed.
pub type DisconnectListener = Box<dyn FnMut(SessionId, &DisconnectReason)>;

/// `(session, heading, cause)` for every error raised on the session.
pub type ErrorListener = Box<dyn FnMut(SessionId, &str, &SessionError)>;

/// Per-session listener lists, cleared on every reclaim.
#[derive(Default)]
pub struct SessionListeners {
    send: Vec<TrafficListener>,
    receive: Vec<TrafficListener>,
    disconnect: Vec<DisconnectListener>,
    error: Vec<ErrorListener>,
}

impl SessionListeners {
    pub(crate) fn add_send(&mut self, listener: TrafficListener) {
        self.send.push(listener);
    }

    pub(crate) fn add_receive(&mut self, listener: TrafficListener) {
        self.receive.push(listener);
    }

    pub(crate) fn add_disconnect(&mut self, listener: DisconnectListener) {
        self.disconnect.push(listener);
    }

    pub(crate) fn add_error(&mut self, listener: ErrorListener) {
        self.error.push(listener);
    }

    pub(crate) fn emit_send(&mut self, id: SessionId, message_type: u8, len: usize) {
        for listener in &mut self.send {
            listener(id, message_type, len);
        }
    }

    pub(crate) fn emit_receive(&mut self, id: SessionId, message_type: u8, len: usize) {
        for listener in &mut self.receive {
            listener(id, message_type, len);
        }
    }

    pub(crate) fn emit_disconnect(&mut self, id: SessionId, reason: &DisconnectReason) {
        for listener in &mut self.disconnect {
            listener(id, reason);
        }
    }

    pub(crate) fn emit_error(&mut self, id: SessionId, heading: &str, cause: &SessionError) {
        for listener in &mut self.error {
            listener(id, heading, cause);
        }
    }

    /// Total registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.send.len() + self.receive.len() + self.disconnect.len() + self.error.len()
    }

    /// True when no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every listener.
    pub fn clear(&mut self) {
        self.send.clear();
        self.receive.clear();
        self.disconnect.clear();
        self.error.clear();
    }
}

impl fmt::Debug for SessionListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionListeners")
            .field("send", &self.send.len())
            .field("receive", &self.receive.len())
            .field("disconnect", &self.disconnect.len())
            .field("error", &self.error.len())
            .finish()
    }
}
