//! Debug logging for sessions, installed when `debug = true`.
//!
//! Control traffic (heartbeats) is skipped to keep the log readable.

use jot_shared::is_reserved;

use crate::session::Session;

/// Installs logging listeners on `session`.
pub fn attach(session: &mut Session) {
    session.on_send_info(|id, message_type, len| {
        if !is_reserved(message_type) {
            tracing::debug!(session = %id, message_type, len, "sent");
        }
    });
    session.on_receive_info(|id, message_type, len| {
        if !is_reserved(message_type) {
            tracing::debug!(session = %id, message_type, len, "received");
        }
    });
    session.on_disconnect(|id, reason| {
        tracing::info!(session = %id, %reason, "disconnected");
    });
    session.on_error(|id, heading, cause| {
        tracing::warn!(session = %id, heading, error = %cause, "session error");
    });
}
