//! # Jot Server
//!
//! Standalone Jot session server with an echo handler on message type 10.
//!
//! ## Usage
//!
//! ```bash
//! jot_server --config jot.toml --port 1337 --debug
//! RUST_LOG=jot_networking=debug jot_server
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jot_networking::{ServerConfig, ServerCore, ServerEvent};

/// Message type answered by the built-in echo handler.
const ECHO: u8 = 10;

/// Command line; flags override the config file.
#[derive(Debug, Parser)]
#[command(name = "jot_server", version, about = "Jot binary-protocol session server")]
struct Args {
    /// TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    /// TCP port to bind.
    #[arg(short, long)]
    port: Option<u16>,

    /// Connections beyond this are refused.
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Heartbeat ping interval in milliseconds.
    #[arg(long)]
    ping_interval_ms: Option<u64>,

    /// Heartbeat timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log every session's traffic, disconnects, and errors.
    #[arg(short, long)]
    debug: bool,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log: String,
}

impl Args {
    fn config(&self) -> Result<ServerConfig, jot_networking::ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_connections) = self.max_connections {
            config.max_connections = max_connections;
        }
        if let Some(interval) = self.ping_interval_ms {
            config.ping_interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_ms {
            config.timeout_ms = timeout;
        }
        config.debug |= self.debug;
        Ok(config)
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log);

    let config = match args.config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };

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
    std::thread::spawn(move || {
        for event in events {
            if let ServerEvent::Disconnected { id, reason } = event {
                tracing::info!(session = %id, %reason, "session ended");
            }
        }
    });

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match server.serve(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed");
            ExitCode::FAILURE
        }
    }
}
