use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::error::ConfigError;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Run a replicated key-value node", long_about = None)]
pub struct NodeArgs {
    /// Port the HTTP API listens on.
    #[arg(long)]
    pub port: u16,

    /// Comma-separated peer base URLs, e.g. http://localhost:8001,http://localhost:8002
    #[arg(long, value_delimiter = ',', required = true)]
    pub peers: Vec<String>,

    /// Seconds between probe cycles.
    #[arg(long = "ping-freq", default_value_t = 15)]
    pub ping_freq: u64,

    /// Seconds before any single peer request is abandoned.
    #[arg(long, default_value_t = 20)]
    pub timeout: u64,

    /// Serve Prometheus counters on this port. Disabled when omitted.
    #[arg(long = "metrics-port")]
    pub metrics_port: Option<u16>,
}

/// Validated, immutable node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub port: u16,
    /// Base URLs without a trailing slash, in the order given.
    pub peers: Vec<String>,
    pub ping_frequency: Duration,
    pub timeout: Duration,
    pub metrics_port: Option<u16>,
}

impl NodeArgs {
    pub fn into_config(self) -> Result<NodeConfig, ConfigError> {
        let config = NodeConfig::new(
            self.port,
            self.peers,
            Duration::from_secs(self.ping_freq),
            Duration::from_secs(self.timeout),
        )?;
        config.with_metrics_port(self.metrics_port)
    }
}

impl NodeConfig {
    pub fn new(
        port: u16,
        peers: Vec<String>,
        ping_frequency: Duration,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if ping_frequency.is_zero() {
            return Err(ConfigError::ZeroDuration("ping frequency"));
        }
        if timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("timeout"));
        }

        let peers = normalize_peers(peers)?;
        Ok(Self {
            port,
            peers,
            ping_frequency,
            timeout,
            metrics_port: None,
        })
    }

    pub fn with_metrics_port(mut self, metrics_port: Option<u16>) -> Result<Self, ConfigError> {
        if metrics_port == Some(self.port) {
            return Err(ConfigError::PortClash(self.port));
        }
        self.metrics_port = metrics_port;
        Ok(self)
    }
}

fn normalize_peers(raw: Vec<String>) -> Result<Vec<String>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::NoPeers);
    }

    let mut peers: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let trimmed = entry.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyPeer);
        }

        let url = Url::parse(trimmed).map_err(|_| ConfigError::InvalidPeer(entry.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
            return Err(ConfigError::InvalidPeer(entry));
        }

        if peers.iter().any(|peer| peer == trimmed) {
            return Err(ConfigError::DuplicatePeer(trimmed.to_string()));
        }
        peers.push(trimmed.to_string());
    }

    Ok(peers)
}
