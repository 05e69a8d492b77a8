//! # Jot Server
//!
//! Accepts TCP connections and hands each one to a pooled [`Session`].
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 current-thread runtime + LocalSet           │
//! │                                                             │
//! │  accept loop ──▶ SessionRegistry::acquire ──▶ spawn_local   │
//! │                                                  │          │
//! │        ┌─────────────── connection task ─────────┘          │
//! │        │  select! {                                         │
//! │        │    socket read   ──▶ registry.data / end / error   │
//! │        │    Outbound rx   ──▶ socket write / shutdown       │
//! │        │    heartbeat     ──▶ registry.poll                 │
//! │        │  }                                                 │
//! │        └──▶ registry.close ──▶ ServerEvent::Disconnected    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread; sessions and pools are `Rc`/`RefCell`.

mod config;
pub mod debugger;
mod transport;

pub use config::{ConfigError, ServerConfig, DEFAULT_BACKLOG, DEFAULT_CURSOR_POOL_SIZE};
pub use transport::{Outbound, TcpTransport};

use std::cell::RefCell;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::LocalSet;

use jot_shared::constants::FRAME_CAPACITY;

use crate::protocol::WirePools;
use crate::session::{Session, SessionId, SessionRegistry};

/// Server lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    /// The listener is bound.
    Listening(SocketAddr),
    /// A session was activated for a new connection.
    Connected {
        /// Session id.
        id: SessionId,
        /// Remote address.
        peer: SocketAddr,
    },
    /// A connection was refused because `max_connections` was reached.
    Rejected(SocketAddr),
    /// A session closed.
    Disconnected {
        /// Session id.
        id: SessionId,
        /// Final disconnect reason.
        reason: String,
    },
    /// The accept loop hit an error.
    Error(String),
}

/// Called once per new session, before any of its traffic is processed.
pub type ConnectionListener = Box<dyn FnMut(&mut Session) + Send>;

/// Fan-out of [`ServerEvent`]s to every subscriber.
#[derive(Clone, Debug, Default)]
struct EventBus {
    subscribers: Vec<Sender<ServerEvent>>,
}

impl EventBus {
    fn emit(&self, event: ServerEvent) {
        for subscriber in &self.subscribers {
            // dropped receivers are fine
            let _ = subscriber.send(event.clone());
        }
    }
}

/// State shared by the accept loop and every connection task.
struct Shared {
    registry: RefCell<SessionRegistry>,
    connection_listeners: RefCell<Vec<ConnectionListener>>,
    events: EventBus,
    debug: bool,
    max_connections: usize,
}

/// TCP server driving Jot sessions.
///
/// Configure it, then call [`ServerCore::serve`].
pub struct ServerCore {
    config: ServerConfig,
    connection_listeners: Vec<ConnectionListener>,
    events: EventBus,
}

impl ServerCore {
    /// Creates a server with the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            connection_listeners: Vec::new(),
            events: EventBus::default(),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Adds a listener for new sessions; register message handlers here.
    pub fn on_connection(&mut self, listener: impl FnMut(&mut Session) + Send + 'static) {
        self.connection_listeners.push(Box::new(listener));
    }

    /// Returns a channel receiving every [`ServerEvent`] from now on.
    pub fn subscribe(&mut self) -> Receiver<ServerEvent> {
        let (tx, rx) = unbounded();
        self.events.subscribers.push(tx);
        rx
    }

    /// Binds and serves until `shutdown` resolves.
    ///
    /// Must run inside a tokio runtime; connection tasks are spawned on a
    /// [`LocalSet`] owned by this call.
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        LocalSet::new().run_until(self.run(shutdown)).await
    }

    async fn run<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            connection_listeners,
            events,
        } = self;

        let listener = bind(&config)?;
        let local_addr = listener.local_addr()?;
        tracing::info!(
            %local_addr,
            max_connections = config.max_connections,
            debug = config.debug,
            "listening"
        );
        events.emit(ServerEvent::Listening(local_addr));

        let wire = Rc::new(WirePools::new(
            config.reader_pool_size,
            config.writer_pool_size,
        ));
        let mut registry =
            SessionRegistry::new(wire, config.heartbeat(), config.session_pool_size);
        let disconnect_events = events.clone();
        registry.on_disconnect(move |id, reason| {
            disconnect_events.emit(ServerEvent::Disconnected {
                id,
                reason: reason.to_string(),
            });
        });

        let shared = Rc::new(Shared {
            registry: RefCell::new(registry),
            connection_listeners: RefCell::new(connection_listeners),
            events,
            debug: config.debug,
            max_connections: config.max_connections,
        });

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => accept(&shared, stream, peer),
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                        shared.events.emit(ServerEvent::Error(err.to_string()));
                    }
                },
            }
        }

        tracing::info!(
            active = shared.registry.borrow().len(),
            "shutting down"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ServerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCore")
            .field("config", &self.config)
            .field("connection_listeners", &self.connection_listeners.len())
            .field("subscribers", &self.events.subscribers.len())
            .finish()
    }
}

fn bind(config: &ServerConfig) -> io::Result<TcpListener> {
    let addr = config
        .bind_addr()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(config.backlog)
}

fn accept(shared: &Rc<Shared>, stream: TcpStream, peer: SocketAddr) {
    if shared.registry.borrow().len() >= shared.max_connections {
        tracing::warn!(%peer, "connection refused: at capacity");
        shared.events.emit(ServerEvent::Rejected(peer));
        return;
    }

    let (tx, rx) = unbounded_channel();
    let id = {
        let mut registry = shared.registry.borrow_mut();
        let id = registry.acquire(Box::new(TcpTransport::new(tx)), Instant::now());
        if let Some(session) = registry.get_mut(id) {
            if shared.debug {
                debugger::attach(session);
            }
            for listener in shared.connection_listeners.borrow_mut().iter_mut() {
                listener(session);
            }
        }
        id
    };

    tracing::debug!(session = %id, %peer, "connected");
    shared.events.emit(ServerEvent::Connected { id, peer });
    tokio::task::spawn_local(drive(Rc::clone(shared), id, stream, rx));
}

/// Connection task: pumps one socket through its session until either side
/// ends it, then runs the close transition.
async fn drive(
    shared: Rc<Shared>,
    id: SessionId,
    stream: TcpStream,
    mut outbound: UnboundedReceiver<Outbound>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = vec![0u8; FRAME_CAPACITY];
    let mut peer_ended = false;

    loop {
        let deadline = shared.registry.borrow().next_deadline(id);
        let wake = deadline.map_or_else(
            || tokio::time::Instant::now() + Duration::from_secs(3600),
            tokio::time::Instant::from_std,
        );

        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    shared.registry.borrow_mut().end(id);
                    peer_ended = true;
                    break;
                }
                Ok(n) => shared.registry.borrow_mut().data(id, &buf[..n], Instant::now()),
                Err(err) => {
                    shared.registry.borrow_mut().error(id, err);
                    break;
                }
            },
            Some(command) = outbound.recv() => match command {
                Outbound::Write(bytes) => {
                    if let Err(err) = writer.write_all(&bytes).await {
                        shared.registry.borrow_mut().error(id, err);
                        break;
                    }
                }
                Outbound::End => {
                    let _ = writer.shutdown().await;
                    break;
                }
                Outbound::NoDelay(enabled) => {
                    if let Err(err) = writer.as_ref().set_nodelay(enabled) {
                        tracing::debug!(session = %id, error = %err, "set_nodelay failed");
                    }
                }
            },
            () = tokio::time::sleep_until(wake), if deadline.is_some() => {
                shared.registry.borrow_mut().poll(id, Instant::now());
            }
        }
    }

    if peer_ended {
        // replies produced by the last delivery are still queued
        while let Ok(Outbound::Write(bytes)) = outbound.try_recv() {
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    }

    shared.registry.borrow_mut().close(id);
}
