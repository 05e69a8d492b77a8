//! End-to-end tests over real TCP sockets.
//!
//! Each test runs a server on its own thread (current-thread runtime) and
//! talks to it with a blocking std client.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use jot_networking::{ServerConfig, ServerCore, ServerEvent};
use tokio::sync::oneshot;

const ECHO: u8 = 10;
const PING: u8 = 1;
const PONG: u8 = 2;
const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    addr: SocketAddr,
    events: Receiver<ServerEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl Harness {
    fn start(config: ServerConfig) -> Self {
        Self::start_with_log(config, None)
    }

    /// Runs the server with a `tracing` subscriber writing into `log`.
    fn start_with_log(config: ServerConfig, log: Option<LogBuffer>) -> Self {
        let mut server = ServerCore::new(config);
        server.on_connection(|session| {
            session.register(ECHO, |session, reader| {
                let text = reader.string()?.to_owned();
                session.send(ECHO, |w| {
                    w.string(&text)?;
                    Ok(())
                });
                Ok(())
            });
        });
        let events = server.subscribe();

        let (shutdown, stop) = oneshot::channel::<()>();
        let thread = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let serve = server.serve(async {
                let _ = stop.await;
            });
            match log {
                Some(log) => {
                    let subscriber = tracing_subscriber::fmt()
                        .with_max_level(tracing::Level::DEBUG)
                        .with_writer(move || log.clone())
                        .finish();
                    tracing::subscriber::with_default(subscriber, || runtime.block_on(serve))
                }
                None => runtime.block_on(serve),
            }
        });

        let addr = match events.recv_timeout(WAIT) {
            Ok(ServerEvent::Listening(addr)) => addr,
            other => panic!("server did not start: {other:?}"),
        };

        Self {
            addr,
            events,
            shutdown: Some(shutdown),
            thread: Some(thread),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_nodelay(true).unwrap();
        stream.set_read_timeout(Some(WAIT)).unwrap();
        stream
    }

    fn wait_for(&self, matches: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
        let deadline = Instant::now() + WAIT;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(left) {
                Ok(event) if matches(&event) => return event,
                Ok(_) => {}
                Err(err) => panic!("expected event not seen: {err}"),
            }
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let result = thread.join().expect("server thread panicked");
            if !thread::panicking() {
                result.expect("server failed");
            }
        }
    }
}

/// Shared sink for formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn config(ping_interval_ms: u64, timeout_ms: u64) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        ping_interval_ms,
        timeout_ms,
        ..ServerConfig::default()
    }
}

fn frame(message_type: u8, payload: &[u8]) -> Vec<u8> {
    let len = u16::try_from(payload.len()).unwrap();
    let mut out = vec![message_type];
    out.extend(len.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn string_frame(message_type: u8, text: &str) -> Vec<u8> {
    let mut payload = vec![u8::try_from(text.len()).unwrap()];
    payload.extend_from_slice(text.as_bytes());
    frame(message_type, &payload)
}

fn read_frame(stream: &mut TcpStream) -> io::Result<(u8, Vec<u8>)> {
    let mut header = [0u8; 3];
    stream.read_exact(&mut header)?;
    let mut payload = vec![0u8; usize::from(u16::from_le_bytes([header[1], header[2]]))];
    stream.read_exact(&mut payload)?;
    Ok((header[0], payload))
}

fn read_echo(stream: &mut TcpStream) -> String {
    let (message_type, payload) = read_frame(stream).unwrap();
    assert_eq!(message_type, ECHO);
    assert_eq!(usize::from(payload[0]), payload.len() - 1);
    String::from_utf8(payload[1..].to_vec()).unwrap()
}

#[test]
fn test_echo_roundtrip() {
    let server = Harness::start(config(60_000, 60_000));
    let mut client = server.connect();

    client.write_all(&string_frame(ECHO, "hello")).unwrap();
    assert_eq!(read_echo(&mut client), "hello");
}

#[test]
fn test_coalesced_and_split_deliveries() {
    let server = Harness::start(config(60_000, 60_000));
    let mut client = server.connect();

    let mut both = string_frame(ECHO, "one");
    both.extend(string_frame(ECHO, "two"));
    client.write_all(&both).unwrap();

    let split = string_frame(ECHO, "three");
    client.write_all(&split[..2]).unwrap();
    client.flush().unwrap();
    thread::sleep(Duration::from_millis(30));
    client.write_all(&split[2..]).unwrap();

    assert_eq!(read_echo(&mut client), "one");
    assert_eq!(read_echo(&mut client), "two");
    assert_eq!(read_echo(&mut client), "three");
}

#[test]
fn test_unanswered_ping_times_out() {
    let server = Harness::start(config(50, 20));
    let mut client = server.connect();
    let started = Instant::now();

    let (message_type, payload) = read_frame(&mut client).unwrap();
    assert_eq!(message_type, PING);
    assert_eq!(payload.len(), 8);

    let mut rest = [0u8; 16];
    assert_eq!(client.read(&mut rest).unwrap(), 0);
    assert!(started.elapsed() < Duration::from_secs(2));

    let event = server.wait_for(|event| matches!(event, ServerEvent::Disconnected { .. }));
    assert_eq!(
        event,
        ServerEvent::Disconnected {
            id: jot_networking::SessionId(1),
            reason: "timed out".to_owned(),
        }
    );
}

#[test]
fn test_pong_keeps_connection_alive() {
    let server = Harness::start(config(50, 150));
    let mut client = server.connect();

    for _ in 0..5 {
        let (message_type, payload) = read_frame(&mut client).unwrap();
        assert_eq!(message_type, PING);
        client.write_all(&frame(PONG, &payload)).unwrap();
    }

    assert!(!server
        .events
        .try_iter()
        .any(|event| matches!(event, ServerEvent::Disconnected { .. })));

    client.write_all(&string_frame(ECHO, "still here")).unwrap();
    loop {
        let (message_type, payload) = read_frame(&mut client).unwrap();
        if message_type == PING {
            client.write_all(&frame(PONG, &payload)).unwrap();
            continue;
        }
        assert_eq!(message_type, ECHO);
        assert_eq!(&payload[1..], b"still here");
        break;
    }
}

#[test]
fn test_client_close_reports_user_ended() {
    let server = Harness::start(config(60_000, 60_000));
    let client = server.connect();
    server.wait_for(|event| matches!(event, ServerEvent::Connected { .. }));

    drop(client);

    let event = server.wait_for(|event| matches!(event, ServerEvent::Disconnected { .. }));
    assert!(matches!(
        event,
        ServerEvent::Disconnected { reason, .. } if reason == "user ended"
    ));
}

#[test]
fn test_max_connections_refuses_extra_clients() {
    let server = Harness::start(ServerConfig {
        max_connections: 1,
        ..config(60_000, 60_000)
    });

    let mut first = server.connect();
    server.wait_for(|event| matches!(event, ServerEvent::Connected { .. }));

    let mut second = server.connect();
    server.wait_for(|event| matches!(event, ServerEvent::Rejected(_)));
    let mut buf = [0u8; 1];
    assert!(matches!(second.read(&mut buf), Ok(0) | Err(_)));

    first.write_all(&string_frame(ECHO, "first")).unwrap();
    assert_eq!(read_echo(&mut first), "first");
}

#[test]
fn test_debug_mode_logs_session_activity() {
    let log = LogBuffer::default();
    let server = Harness::start_with_log(
        ServerConfig {
            debug: true,
            ..config(60_000, 60_000)
        },
        Some(log.clone()),
    );
    let mut client = server.connect();

    client.write_all(&string_frame(ECHO, "traced")).unwrap();
    assert_eq!(read_echo(&mut client), "traced");

    drop(client);
    server.wait_for(|event| matches!(event, ServerEvent::Disconnected { .. }));
    drop(server);

    let lines = log.contents();
    assert!(lines.contains("received"), "{lines}");
    assert!(lines.contains("sent"), "{lines}");
    assert!(lines.contains("disconnected"), "{lines}");
}
