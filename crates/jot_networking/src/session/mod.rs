//! # Sessions
//!
//! One [`Session`] per live connection: framing, dispatch, outbound send,
//! heartbeat, and disconnect bookkeeping.
//!
//! ## Lifecycle
//!
//! ```text
//!   Reclaimed ──enable──▶ Active ──close──▶ Closing ──disable──▶ Reclaimed
//!       ▲                                                           │
//!       └──────────────────────── pool ◀────────────────────────────┘
//! ```
//!
//! Sessions are pooled by the [`SessionRegistry`]; a reclaimed session keeps
//! its allocations (handler table, frame accumulator) for the next connection.

mod events;
mod heartbeat;
mod registry;

pub use events::{
    DisconnectListener, DisconnectReason, ErrorListener, SessionListeners, TrafficListener,
};
pub use heartbeat::{Heartbeat, HeartbeatConfig, HeartbeatEvent};
pub use registry::SessionRegistry;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::mem;
use std::rc::Rc;
use std::time::{Duration, Instant};

use jot_core::Poolable;
use jot_shared::{is_reserved, ControlMessage, MAX_PAYLOAD_SIZE, MAX_STRING_LEN};

use crate::error::{EncodeResult, SessionError};
use crate::protocol::{FrameDecoder, FrameEvent, Reader, WirePools, Writer};

/// Session identifier, unique while the session is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a [`Session`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Connected and processing traffic.
    Active,
    /// Close observed; reason final, disconnect emitted.
    Closing,
    /// Idle in the pool.
    #[default]
    Reclaimed,
}

/// Byte-stream connection a session writes to.
pub trait Transport {
    /// Queues bytes for delivery.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Requests shutdown once queued writes are flushed.
    fn end(&mut self);

    /// Toggles Nagle's algorithm.
    fn set_no_delay(&mut self, enabled: bool) -> io::Result<()>;
}

/// Payload handler for one message type.
///
/// The reader is bounded to the frame's payload.
pub type MessageHandler = Box<dyn FnMut(&mut Session, &mut Reader) -> Result<(), SessionError>>;

/// Activation arguments for a pooled [`Session`].
pub struct SessionInit {
    /// Identifier assigned by the registry.
    pub id: SessionId,
    /// Connection to write to.
    pub transport: Box<dyn Transport>,
    /// Activation time; heartbeat timestamps count from here.
    pub now: Instant,
}

/// One live connection.
pub struct Session {
    id: SessionId,
    state: SessionState,
    transport: Option<Box<dyn Transport>>,
    wire: Rc<WirePools>,
    decoder: FrameDecoder,
    handlers: HashMap<u8, MessageHandler>,
    listeners: SessionListeners,
    heartbeat: Heartbeat,
    reason: DisconnectReason,
}

impl Session {
    /// Creates a reclaimed session that draws cursors from `wire`.
    #[must_use]
    pub fn new(wire: Rc<WirePools>, heartbeat: HeartbeatConfig) -> Self {
        Self {
            id: SessionId::default(),
            state: SessionState::Reclaimed,
            transport: None,
            wire,
            decoder: FrameDecoder::new(),
            handlers: HashMap::new(),
            listeners: SessionListeners::default(),
            heartbeat: Heartbeat::new(heartbeat, Instant::now()),
            reason: DisconnectReason::Unknown,
        }
    }

    /// Session identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True between activation and close.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Last measured heartbeat round trip.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.heartbeat.latency()
    }

    /// Reason recorded so far (`unknown` until something ends the session).
    #[inline]
    #[must_use]
    pub fn disconnect_reason(&self) -> &DisconnectReason {
        &self.reason
    }

    /// Binds `handler` to `message_type`, replacing any previous handler.
    ///
    /// Reserved types (`0..=9`) never reach a registered handler: Ping, Pong
    /// and Error are answered internally and the rest are dropped.
    pub fn register<F>(&mut self, message_type: u8, handler: F)
    where
        F: FnMut(&mut Session, &mut Reader) -> Result<(), SessionError> + 'static,
    {
        self.handlers.insert(message_type, Box::new(handler));
    }

    /// Adds a listener for every frame sent.
    pub fn on_send_info(&mut self, listener: impl FnMut(SessionId, u8, usize) + 'static) {
        self.listeners.add_send(Box::new(listener));
    }

    /// Adds a listener for every frame received.
    pub fn on_receive_info(&mut self, listener: impl FnMut(SessionId, u8, usize) + 'static) {
        self.listeners.add_receive(Box::new(listener));
    }

    /// Adds a listener for the close transition.
    pub fn on_disconnect(
        &mut self,
        listener: impl FnMut(SessionId, &DisconnectReason) + 'static,
    ) {
        self.listeners.add_disconnect(Box::new(listener));
    }

    /// Adds a listener for errors raised on this session.
    pub fn on_error(&mut self, listener: impl FnMut(SessionId, &str, &SessionError) + 'static) {
        self.listeners.add_error(Box::new(listener));
    }

    /// Feeds one transport delivery through the frame accumulator.
    ///
    /// Partial frames wait for more bytes; coalesced frames are dispatched
    /// in order.
    pub fn on_data(&mut self, bytes: &[u8], now: Instant) {
        if !self.is_active() {
            return;
        }

        let mut decoder = mem::take(&mut self.decoder);
        decoder.push(bytes);
        while let Some(event) = decoder.next_event() {
            match event {
                FrameEvent::Frame(frame) => self.receive(frame, now),
                FrameEvent::Oversized(header) => {
                    let cause = SessionError::FrameTooLarge {
                        message_type: header.message_type,
                        payload_len: usize::from(header.payload_len),
                        max: MAX_PAYLOAD_SIZE,
                    };
                    self.error("receive", &cause);
                }
            }
        }
        self.decoder = decoder;
    }

    /// Decodes and dispatches one complete frame.
    ///
    /// Receive listeners fire after a successful dispatch. Unknown and
    /// unassigned reserved types are dropped without notification. Decode failures are reported
    /// through [`Session::error`] and leave the session open.
    pub fn receive(&mut self, frame: &[u8], now: Instant) {
        let wire = Rc::clone(&self.wire);
        let mut reader = wire.readers.acquire(frame);

        let header = match reader.header() {
            Ok(header) => header,
            Err(err) => {
                self.error("receive", &err.into());
                return;
            }
        };
        let message_type = header.message_type;

        let result = if let Some(control) = ControlMessage::from_u8(message_type) {
            self.control(control, &mut *reader, now)
        } else if is_reserved(message_type) {
            tracing::trace!(session = %self.id, message_type, "reserved type, frame dropped");
            return;
        } else if let Some(mut handler) = self.handlers.remove(&message_type) {
            let result = handler(self, &mut *reader);
            if self.is_active() {
                // the handler may have registered a replacement for itself
                self.handlers.entry(message_type).or_insert(handler);
            }
            result
        } else {
            tracing::trace!(session = %self.id, message_type, "no handler, frame dropped");
            return;
        };

        match result {
            Ok(()) => self.listeners.emit_receive(self.id, message_type, frame.len()),
            Err(err) => self.error("receive", &err),
        }
    }

    fn control(
        &mut self,
        message: ControlMessage,
        reader: &mut Reader,
        now: Instant,
    ) -> Result<(), SessionError> {
        match message {
            ControlMessage::Ping => {
                let stamp = reader.u64()?;
                self.write_frame(ControlMessage::Pong.as_u8(), |w| {
                    w.u64(stamp)?;
                    Ok(())
                })
            }
            ControlMessage::Pong => {
                let stamp = reader.u64()?;
                let latency = self.heartbeat.on_pong(stamp, now);
                tracing::trace!(session = %self.id, ?latency, "pong");
                Ok(())
            }
            ControlMessage::Error => {
                let text = reader.string()?.to_owned();
                // reported locally only; answering with another Error frame could loop
                self.listeners
                    .emit_error(self.id, "peer", &SessionError::Peer(text));
                Ok(())
            }
        }
    }

    /// Encodes and sends one frame.
    ///
    /// Returns `false` if encoding or the transport failed; the failure has
    /// already been reported through [`Session::error`].
    pub fn send<F>(&mut self, message_type: u8, encode: F) -> bool
    where
        F: FnOnce(&mut Writer) -> EncodeResult<()>,
    {
        match self.write_frame(message_type, encode) {
            Ok(()) => true,
            Err(err) => {
                self.error("send", &err);
                false
            }
        }
    }

    fn write_frame<F>(&mut self, message_type: u8, encode: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Writer) -> EncodeResult<()>,
    {
        if !self.is_active() {
            return Err(SessionError::NotConnected);
        }

        let wire = Rc::clone(&self.wire);
        let mut writer = wire.writers.acquire(());
        let frame = writer.frame(message_type, encode)?;

        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        transport.write(frame)?;

        self.listeners.emit_send(self.id, message_type, frame.len());
        Ok(())
    }

    /// Reports an error to the peer (best effort) and to the error listeners.
    ///
    /// The peer receives an Error control frame carrying `"{heading}: {cause}"`,
    /// truncated to the string limit.
    pub fn error(&mut self, heading: &str, cause: &SessionError) {
        let mut text = format!("{heading}: {cause}");
        truncate_at_boundary(&mut text, MAX_STRING_LEN);

        let sent = self.write_frame(ControlMessage::Error.as_u8(), |w| {
            w.string(&text)?;
            Ok(())
        });
        if let Err(err) = sent {
            tracing::debug!(session = %self.id, error = %err, "error frame not delivered");
        }

        self.listeners.emit_error(self.id, heading, cause);
    }

    /// Records `reason` and asks the transport to shut down.
    ///
    /// The session stays active until the transport's close arrives.
    pub fn kick(&mut self, reason: impl Into<DisconnectReason>) {
        self.reason = reason.into();
        tracing::debug!(session = %self.id, reason = %self.reason, "kick");
        if let Some(transport) = self.transport.as_mut() {
            transport.end();
        }
    }

    /// The peer closed its end of the stream.
    pub fn on_end(&mut self) {
        if self.reason.is_unknown() {
            self.reason = DisconnectReason::UserEnded;
        }
    }

    /// The transport failed. Closing is left to the close notification.
    pub fn on_transport_error(&mut self, err: io::Error) {
        if self.reason.is_unknown() {
            self.reason = DisconnectReason::SocketError;
        }
        self.listeners
            .emit_error(self.id, "socket", &SessionError::Transport(err));
    }

    /// Close transition: cancels the heartbeat and emits the disconnect.
    ///
    /// Returns `false` if the session was not active.
    pub fn close(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = SessionState::Closing;
        self.heartbeat.stop();
        self.listeners.emit_disconnect(self.id, &self.reason);
        true
    }

    /// Fires due heartbeat timers: sends Pings, kicks on timeout.
    pub fn poll_timers(&mut self, now: Instant) {
        if !self.is_active() {
            return;
        }
        while let Some(event) = self.heartbeat.poll(now) {
            match event {
                HeartbeatEvent::SendPing(stamp) => {
                    let sent = self.write_frame(ControlMessage::Ping.as_u8(), |w| {
                        w.u64(stamp)?;
                        Ok(())
                    });
                    if let Err(err) = sent {
                        self.error("heartbeat", &err);
                    }
                }
                HeartbeatEvent::TimedOut => self.kick(DisconnectReason::TimedOut),
            }
        }
    }

    /// When [`Session::poll_timers`] next has work, if ever.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.is_active() {
            self.heartbeat.next_deadline()
        } else {
            None
        }
    }
}

impl Poolable for Session {
    type Args<'a> = SessionInit;

    fn enable(&mut self, init: SessionInit) {
        let SessionInit { id, mut transport, now } = init;
        if let Err(err) = transport.set_no_delay(true) {
            tracing::warn!(session = %id, error = %err, "could not disable Nagle");
        }

        self.id = id;
        self.state = SessionState::Active;
        self.transport = Some(transport);
        self.reason = DisconnectReason::Unknown;
        self.handlers.clear();
        self.listeners.clear();
        self.decoder.reset();
        self.heartbeat.start(now);
    }

    fn disable(&mut self) {
        self.transport = None;
        self.handlers.clear();
        self.listeners.clear();
        self.decoder.reset();
        self.heartbeat.stop();
        self.state = SessionState::Reclaimed;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("handlers", &self.handlers.len())
            .field("listeners", &self.listeners)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Cuts `text` to at most `max` bytes without splitting a character.
fn truncate_at_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::FrameHeader;
    use std::cell::RefCell;

    /// Everything a [`MockTransport`] has been asked to do.
    #[derive(Debug, Default)]
    pub(crate) struct Wire {
        pub written: Vec<Vec<u8>>,
        pub ended: bool,
        pub no_delay: Option<bool>,
    }

    impl Wire {
        /// Written frames with the given message type.
        pub fn frames_of(&self, message_type: u8) -> Vec<&[u8]> {
            self.written
                .iter()
                .filter(|frame| frame[0] == message_type)
                .map(Vec::as_slice)
                .collect()
        }
    }

    #[derive(Clone, Debug, Default)]
    pub(crate) struct MockTransport(pub Rc<RefCell<Wire>>);

    impl Transport for MockTransport {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.0.borrow_mut().written.push(bytes.to_vec());
            Ok(())
        }

        fn end(&mut self) {
            self.0.borrow_mut().ended = true;
        }

        fn set_no_delay(&mut self, enabled: bool) -> io::Result<()> {
            self.0.borrow_mut().no_delay = Some(enabled);
            Ok(())
        }
    }

    pub(crate) fn frame(message_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = FrameHeader::new(message_type, payload.len() as u16)
            .to_bytes()
            .to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn active(config: HeartbeatConfig) -> (Session, Rc<RefCell<Wire>>, Instant) {
        let transport = MockTransport::default();
        let wire = Rc::clone(&transport.0);
        let mut session = Session::new(Rc::new(WirePools::new(2, 2)), config);
        let now = Instant::now();
        session.enable(SessionInit {
            id: SessionId(1),
            transport: Box::new(transport),
            now,
        });
        (session, wire, now)
    }

    fn collect_errors(session: &mut Session) -> Rc<RefCell<Vec<String>>> {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        session.on_error(move |_, heading, cause| {
            sink.borrow_mut().push(format!("{heading}: {cause}"));
        });
        errors
    }

    fn collect_u32s(session: &mut Session, message_type: u8) -> Rc<RefCell<Vec<u32>>> {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&values);
        session.register(message_type, move |_, reader| {
            sink.borrow_mut().push(reader.u32()?);
            Ok(())
        });
        values
    }

    #[test]
    fn test_enable_activates_and_disables_nagle() {
        let (session, wire, _) = active(HeartbeatConfig::default());
        assert!(session.is_active());
        assert_eq!(session.id(), SessionId(1));
        assert_eq!(session.latency(), Duration::ZERO);
        assert!(session.disconnect_reason().is_unknown());
        assert_eq!(wire.borrow().no_delay, Some(true));
    }

    #[test]
    fn test_dispatch_split_and_coalesced() {
        let (mut session, _, now) = active(HeartbeatConfig::default());
        let values = collect_u32s(&mut session, 10);

        let mut stream = frame(10, &1u32.to_le_bytes());
        stream.extend(frame(10, &2u32.to_le_bytes()));
        stream.extend(frame(10, &3u32.to_le_bytes()));

        session.on_data(&stream[..5], now);
        assert!(values.borrow().is_empty());
        session.on_data(&stream[5..], now);

        assert_eq!(*values.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_register_overwrites() {
        let (mut session, _, now) = active(HeartbeatConfig::default());
        let first = collect_u32s(&mut session, 10);
        let second = collect_u32s(&mut session, 10);

        session.on_data(&frame(10, &7u32.to_le_bytes()), now);
        assert!(first.borrow().is_empty());
        assert_eq!(*second.borrow(), vec![7]);
    }

    #[test]
    fn test_unknown_type_is_dropped_silently() {
        let (mut session, wire, now) = active(HeartbeatConfig::default());
        let errors = collect_errors(&mut session);
        let reserved = collect_u32s(&mut session, 5);

        session.on_data(&frame(200, b"ignored"), now);
        session.on_data(&frame(5, &7u32.to_le_bytes()), now);

        assert!(reserved.borrow().is_empty());
        assert!(errors.borrow().is_empty());
        assert!(wire.borrow().written.is_empty());
        assert!(session.is_active());
    }

    #[test]
    fn test_handler_can_reply() {
        let (mut session, wire, now) = active(HeartbeatConfig::default());
        session.register(10, |session, reader| {
            let name = reader.string()?.to_owned();
            session.send(11, |w| {
                w.string(&format!("hello {name}"))?;
                Ok(())
            });
            Ok(())
        });

        session.on_data(&frame(10, b"\x03bob"), now);

        let wire = wire.borrow();
        let replies = wire.frames_of(11);
        assert_eq!(replies.len(), 1);
        let mut reader = Reader::from_bytes(replies[0]);
        reader.header().unwrap();
        assert_eq!(reader.string(), Ok("hello bob"));
    }

    #[test]
    fn test_truncated_payload_reports_error_and_stays_open() {
        let (mut session, wire, now) = active(HeartbeatConfig::default());
        let errors = collect_errors(&mut session);
        let values = collect_u32s(&mut session, 10);

        // frame carries 3 payload bytes, handler wants 4
        let mut bytes = vec![10, 3, 0, 0xaa, 0xbb, 0xcc];
        bytes.extend(frame(10, &9u32.to_le_bytes()));
        session.on_data(&bytes, now);

        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].starts_with("receive: read of 4 bytes"));
        assert_eq!(*values.borrow(), vec![9]);
        assert!(session.is_active());

        let wire = wire.borrow();
        assert!(!wire.ended);
        let error_frames = wire.frames_of(ControlMessage::Error.as_u8());
        assert_eq!(error_frames.len(), 1);
        let mut reader = Reader::from_bytes(error_frames[0]);
        reader.header().unwrap();
        assert!(reader.string().unwrap().starts_with("receive: "));
    }

    #[test]
    fn test_oversized_frame_is_reported_and_skipped() {
        let (mut session, _, now) = active(HeartbeatConfig::default());
        let errors = collect_errors(&mut session);
        let values = collect_u32s(&mut session, 10);

        let oversized = (MAX_PAYLOAD_SIZE + 1) as u16;
        let mut bytes = FrameHeader::new(10, oversized).to_bytes().to_vec();
        bytes.resize(bytes.len() + usize::from(oversized), 0);
        bytes.extend(frame(10, &4u32.to_le_bytes()));
        session.on_data(&bytes, now);

        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(*values.borrow(), vec![4]);
    }

    #[test]
    fn test_send_failure_reports_error() {
        let (mut session, wire, _) = active(HeartbeatConfig::default());
        let errors = collect_errors(&mut session);

        let long = "x".repeat(256);
        assert!(!session.send(12, |w| {
            w.string(&long)?;
            Ok(())
        }));

        assert_eq!(
            *errors.borrow(),
            vec!["send: string of 256 bytes exceeds the 255 byte limit".to_owned()]
        );
        assert!(wire.borrow().frames_of(12).is_empty());
        assert_eq!(wire.borrow().frames_of(ControlMessage::Error.as_u8()).len(), 1);
    }

    #[test]
    fn test_send_info_listeners() {
        let (mut session, _, _) = active(HeartbeatConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        session.on_send_info(move |id, message_type, len| {
            sink.borrow_mut().push((id, message_type, len));
        });

        assert!(session.send(20, |w| {
            w.u16(1)?;
            Ok(())
        }));
        assert_eq!(*seen.borrow(), vec![(SessionId(1), 20, 5)]);
    }

    #[test]
    fn test_receive_info_follows_successful_dispatch() {
        let (mut session, _, now) = active(HeartbeatConfig::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        session.register(10, move |_, reader| {
            sink.borrow_mut().push("handler".to_owned());
            reader.u32()?;
            Ok(())
        });
        let sink = Rc::clone(&log);
        session.on_receive_info(move |id, message_type, len| {
            sink.borrow_mut().push(format!("info({id},{message_type},{len})"));
        });

        session.on_data(&frame(10, &[1, 2]), now);
        assert_eq!(*log.borrow(), vec!["handler".to_owned()]);

        log.borrow_mut().clear();
        session.on_data(&frame(10, &3u32.to_le_bytes()), now);
        session.on_data(&frame(200, b""), now);
        assert_eq!(
            *log.borrow(),
            vec!["handler".to_owned(), "info(1,10,7)".to_owned()]
        );
    }

    #[test]
    fn test_transport_error_reaches_error_listeners() {
        let (mut session, _, _) = active(HeartbeatConfig::default());
        let errors = collect_errors(&mut session);

        session.on_transport_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));

        assert_eq!(
            *errors.borrow(),
            vec!["socket: transport error: reset".to_owned()]
        );
        assert_eq!(session.disconnect_reason(), &DisconnectReason::SocketError);
        assert!(session.is_active());
    }

    #[test]
    fn test_ping_from_peer_is_echoed() {
        let (mut session, wire, now) = active(HeartbeatConfig::default());
        session.on_data(&frame(1, &1234u64.to_le_bytes()), now);

        let mut expected = vec![ControlMessage::Pong.as_u8(), 8, 0];
        expected.extend(1234u64.to_le_bytes());
        assert_eq!(wire.borrow().written, vec![expected]);
    }

    #[test]
    fn test_peer_error_is_not_echoed() {
        let (mut session, wire, now) = active(HeartbeatConfig::default());
        let errors = collect_errors(&mut session);

        session.on_data(&frame(3, b"\x04oops"), now);

        assert_eq!(*errors.borrow(), vec!["peer: peer reported: oops".to_owned()]);
        assert!(wire.borrow().written.is_empty());
    }

    #[test]
    fn test_heartbeat_timeout_kicks() {
        let (mut session, wire, start) = active(HeartbeatConfig::from_millis(50, 20));
        let reasons = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reasons);
        session.on_disconnect(move |_, reason| sink.borrow_mut().push(reason.to_string()));

        assert_eq!(session.next_deadline(), Some(start + ms(50)));
        session.poll_timers(start + ms(50));

        let mut ping = vec![ControlMessage::Ping.as_u8(), 8, 0];
        ping.extend(50u64.to_le_bytes());
        assert_eq!(wire.borrow().written, vec![ping]);
        assert!(!wire.borrow().ended);

        session.poll_timers(start + ms(70));
        assert!(wire.borrow().ended);
        assert_eq!(session.disconnect_reason(), &DisconnectReason::TimedOut);

        // transport close arrives afterwards
        session.on_end();
        assert!(session.close());
        assert_eq!(*reasons.borrow(), vec!["timed out".to_owned()]);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_pong_keeps_session_alive() {
        let (mut session, wire, start) = active(HeartbeatConfig::from_millis(50, 20));

        session.poll_timers(start + ms(50));
        session.on_data(&frame(2, &50u64.to_le_bytes()), start + ms(60));
        session.poll_timers(start + ms(90));

        assert_eq!(session.latency(), ms(10));
        assert!(!wire.borrow().ended);
        assert!(session.disconnect_reason().is_unknown());
        assert_eq!(session.next_deadline(), Some(start + ms(100)));
    }

    #[test]
    fn test_reason_precedence() {
        let (mut session, _, _) = active(HeartbeatConfig::default());
        session.kick("banned");
        session.on_end();
        session.on_transport_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(session.disconnect_reason().to_string(), "banned");

        let (mut session, _, _) = active(HeartbeatConfig::default());
        session.on_end();
        session.on_transport_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(session.disconnect_reason(), &DisconnectReason::UserEnded);

        let (mut session, _, _) = active(HeartbeatConfig::default());
        session.on_transport_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        session.kick(DisconnectReason::TimedOut);
        assert_eq!(session.disconnect_reason(), &DisconnectReason::TimedOut);
    }

    #[test]
    fn test_close_once_then_reclaim() {
        let (mut session, wire, now) = active(HeartbeatConfig::default());
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        session.on_disconnect(move |_, _| *sink.borrow_mut() += 1);
        collect_u32s(&mut session, 10);

        assert!(session.close());
        assert!(!session.close());
        assert_eq!(*count.borrow(), 1);
        assert_eq!(session.state(), SessionState::Closing);

        assert!(!session.send(10, |_| Ok(())));
        session.on_data(&frame(10, &1u32.to_le_bytes()), now);

        session.disable();
        session.disable();
        assert_eq!(session.state(), SessionState::Reclaimed);
        assert!(session.handlers.is_empty());
        assert!(session.listeners.is_empty());
        assert!(wire.borrow().written.is_empty());
    }

    #[test]
    fn test_error_text_is_truncated_on_char_boundary() {
        let mut text = format!("{}é", "a".repeat(254));
        truncate_at_boundary(&mut text, MAX_STRING_LEN);
        assert_eq!(text.len(), 254);

        let (mut session, wire, _) = active(HeartbeatConfig::default());
        session.error("x", &SessionError::Handler("é".repeat(200)));
        let wire = wire.borrow();
        let mut reader = Reader::from_bytes(&wire.written[0]);
        reader.header().unwrap();
        assert!(reader.string().unwrap().len() <= MAX_STRING_LEN);
    }
}
