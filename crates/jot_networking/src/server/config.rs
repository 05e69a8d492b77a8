//! Server configuration, loadable from TOML.
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```toml
//! port = 4000
//! debug = true
//! ping_interval_ms = 2000
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use jot_shared::{
    DEFAULT_MAX_CONNECTIONS, DEFAULT_PING_INTERVAL_MS, DEFAULT_PORT, DEFAULT_TIMEOUT_MS,
};

use crate::session::HeartbeatConfig;

/// Cursor pool size per direction.
pub const DEFAULT_CURSOR_POOL_SIZE: usize = 25;

/// Listen backlog.
pub const DEFAULT_BACKLOG: u32 = 511;

/// Configuration loading failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`ServerConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// `host` is not an IP address.
    #[error("invalid host address: {0}")]
    InvalidHost(String),
}

/// Server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,
    /// TCP port to bind. `0` picks a free port.
    pub port: u16,
    /// Listen backlog.
    pub backlog: u32,
    /// Connections beyond this are refused.
    pub max_connections: usize,
    /// Logs traffic, disconnects, and errors of every session.
    pub debug: bool,
    /// Time between heartbeat pings.
    pub ping_interval_ms: u64,
    /// Time a ping may go unanswered.
    pub timeout_ms: u64,
    /// Pre-built readers.
    pub reader_pool_size: usize,
    /// Pre-built writers.
    pub writer_pool_size: usize,
    /// Pre-built sessions.
    pub session_pool_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            debug: false,
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            reader_pool_size: DEFAULT_CURSOR_POOL_SIZE,
            writer_pool_size: DEFAULT_CURSOR_POOL_SIZE,
            session_pool_size: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Heartbeat timing for new sessions.
    #[must_use]
    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig::from_millis(self.ping_interval_ms, self.timeout_ms)
    }
}
