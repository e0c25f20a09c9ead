//! Environment-driven gateway configuration.

use anyhow::Context;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration, read once at startup.
///
/// - `LISTEN_ADDR`: socket address to bind (default `0.0.0.0:8080`)
/// - `JOURNAL_PATH`: journal file for the durable store; omitted means a
///   volatile in-memory store
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    pub journal_path: Option<PathBuf>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let listen_addr = match env::var("LISTEN_ADDR") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid LISTEN_ADDR: {raw}"))?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let journal_path = env::var_os("JOURNAL_PATH").map(PathBuf::from);

        Ok(Self {
            listen_addr,
            journal_path,
        })
    }
}
