//! # Session Registry
//!
//! Id allocation and active-set bookkeeping over a pool of [`Session`]s.

use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use std::time::Instant;

use jot_core::ObjectPool;

use super::{
    DisconnectListener, DisconnectReason, HeartbeatConfig, Session, SessionId, SessionInit,
    Transport,
};
use crate::protocol::WirePools;

/// Owns every active [`Session`] and the pool they return to.
pub struct SessionRegistry {
    pool: ObjectPool<Session>,
    active: HashMap<SessionId, Session>,
    /// Last id handed out; ids only ever increase.
    last_id: u64,
    disconnect_listeners: Vec<DisconnectListener>,
}

impl SessionRegistry {
    /// Creates a registry with `pool_size` sessions pre-built.
    #[must_use]
    pub fn new(wire: Rc<WirePools>, heartbeat: HeartbeatConfig, pool_size: usize) -> Self {
        Self {
            pool: ObjectPool::new(
                move || Session::new(Rc::clone(&wire), heartbeat),
                pool_size,
            ),
            active: HashMap::with_capacity(pool_size),
            last_id: 0,
            disconnect_listeners: Vec::new(),
        }
    }

    /// Adds a listener called for every session that closes.
    pub fn on_disconnect(&mut self, listener: impl FnMut(SessionId, &DisconnectReason) + 'static) {
        self.disconnect_listeners.push(Box::new(listener));
    }

    /// Activates a pooled session on `transport` and returns its id.
    pub fn acquire(&mut self, transport: Box<dyn Transport>, now: Instant) -> SessionId {
        self.last_id += 1;
        let id = SessionId(self.last_id);

        let session = self.pool.retrieve(SessionInit { id, transport, now });
        self.active.insert(id, session);

        tracing::debug!(session = %id, active = self.active.len(), "session acquired");
        id
    }

    /// Close transition for `id`: removes it, emits the disconnect, and
    /// returns the session to the pool.
    ///
    /// Returns the final reason, or `None` if `id` was not active.
    pub fn close(&mut self, id: SessionId) -> Option<DisconnectReason> {
        let mut session = self.active.remove(&id)?;
        session.close();
        let reason = session.disconnect_reason().clone();

        for listener in &mut self.disconnect_listeners {
            listener(id, &reason);
        }
        self.pool.release(session);

        tracing::debug!(session = %id, %reason, active = self.active.len(), "session closed");
        Some(reason)
    }

    /// Routes a transport delivery.
    pub fn data(&mut self, id: SessionId, bytes: &[u8], now: Instant) {
        if let Some(session) = self.active.get_mut(&id) {
            session.on_data(bytes, now);
        }
    }

    /// Routes the peer's end of stream.
    pub fn end(&mut self, id: SessionId) {
        if let Some(session) = self.active.get_mut(&id) {
            session.on_end();
        }
    }

    /// Routes a transport error.
    pub fn error(&mut self, id: SessionId, err: io::Error) {
        if let Some(session) = self.active.get_mut(&id) {
            session.on_transport_error(err);
        }
    }

    /// Fires due heartbeat timers of one session.
    pub fn poll(&mut self, id: SessionId, now: Instant) {
        if let Some(session) = self.active.get_mut(&id) {
            session.poll_timers(now);
        }
    }

    /// Fires due heartbeat timers of every session.
    pub fn poll_timers(&mut self, now: Instant) {
        for session in self.active.values_mut() {
            session.poll_timers(now);
        }
    }

    /// Next heartbeat deadline of one session.
    #[must_use]
    pub fn next_deadline(&self, id: SessionId) -> Option<Instant> {
        self.active.get(&id).and_then(Session::next_deadline)
    }

    /// Active session by id.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.active.get(&id)
    }

    /// Active session by id, mutably.
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.active.get_mut(&id)
    }

    /// True while `id` is active.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.active.contains_key(&id)
    }

    /// Number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// True when no session is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Idle sessions waiting in the pool.
    #[must_use]
    pub fn available(&self) -> usize {
        self.pool.available()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("active", &self.active.len())
            .field("available", &self.pool.available())
            .field("last_id", &self.last_id)
            .finish_non_exhaustive()
    }
}
