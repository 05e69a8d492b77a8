//! # Jot Networking
//!
//! Connection-oriented sessions over a compact, length-prefixed binary
//! protocol.
//!
//! ## Architecture
//!
//! - **Protocol**: pooled [`Reader`]/[`Writer`] cursors over 8 KiB arenas,
//!   nested sub-messages, and [`FrameDecoder`] for stream reassembly
//! - **Session**: per-connection dispatch, outbound send, heartbeat, and
//!   disconnect bookkeeping, pooled by a [`SessionRegistry`]
//! - **Server**: tokio TCP glue on a single-threaded runtime
//!
//! ## Data Flow
//!
//! ```text
//! socket bytes ──▶ FrameDecoder ──▶ pooled Reader ──▶ handler(type)
//!                                                        │
//! socket ◀── Transport ◀── frame() ◀── pooled Writer ◀───┘ send
//! ```
//!
//! Message types `0..=9` are reserved: Ping (1), Pong (2), and Error (3)
//! are answered by the session itself.
//!
//! ## Example
//!
//! ```rust,ignore
//! use jot_networking::{ServerConfig, ServerCore};
//!
//! let mut server = ServerCore::new(ServerConfig::default());
//! server.on_connection(|session| {
//!     session.register(10, |session, reader| {
//!         let text = reader.string()?.to_owned();
//!         session.send(10, |w| { w.string(&text)?; Ok(()) });
//!         Ok(())
//!     });
//! });
//! server.serve(tokio::signal::ctrl_c().map(drop)).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod protocol;
pub mod server;
pub mod session;

pub use error::{DecodeError, DecodeResult, EncodeOverflow, EncodeResult, SessionError};
pub use protocol::{FrameDecoder, FrameEvent, FrameHeader, Reader, WirePools, Writer};
pub use server::{ConfigError, ServerConfig, ServerCore, ServerEvent};
pub use session::{
    DisconnectReason, HeartbeatConfig, Session, SessionId, SessionRegistry, SessionState,
    Transport,
};
