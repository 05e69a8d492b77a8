//! TCP side of a [`Transport`].
//!
//! Sessions run synchronously; the socket is owned by the connection task.
//! [`TcpTransport`] bridges the two with an unbounded channel, so a session
//! write never blocks and writes reach the socket in call order.

use std::io;

use tokio::sync::mpsc::UnboundedSender;

use crate::session::Transport;

/// Instruction for the connection task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Write these bytes.
    Write(Vec<u8>),
    /// Flush and shut down the write side.
    End,
    /// Toggle `TCP_NODELAY`.
    NoDelay(bool),
}

/// [`Transport`] handing work to a connection task.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    tx: UnboundedSender<Outbound>,
}

impl TcpTransport {
    /// Wraps the sending half of a connection task's queue.
    #[must_use]
    pub fn new(tx: UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    fn push(&self, command: Outbound) -> io::Result<()> {
        self.tx
            .send(command)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "connection task has exited"))
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.push(Outbound::Write(bytes.to_vec()))
    }

    fn end(&mut self) {
        // a gone task means the socket is already closed
        let _ = self.push(Outbound::End);
    }

    fn set_no_delay(&mut self, enabled: bool) -> io::Result<()> {
        self.push(Outbound::NoDelay(enabled))
    }
}
