//! Error types shared by the store, the peer client and the synchronizer.
//!
//! None of these are fatal to a running node. Store and peer errors abort
//! the single operation that produced them; the caller logs and moves on.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to produce the canonical encoding of the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure talking to a single peer.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Connection refused, deadline exceeded, body read failure and so on.
    #[error("request to {peer} failed: {source}")]
    Transport {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{peer} answered {status}")]
    Status { peer: String, status: StatusCode },

    #[error("{peer} sent an unreadable body: {source}")]
    Body {
        peer: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Why an anti-entropy attempt was abandoned.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("local digest unavailable: {0}")]
    LocalDigest(#[from] StoreError),

    #[error("peer digest unavailable: {0}")]
    RemoteDigest(#[source] PeerError),

    #[error("store push failed: {0}")]
    Push(#[source] PeerError),
}

/// Invalid startup configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one peer must be configured")]
    NoPeers,

    #[error("peer list contains an empty entry")]
    EmptyPeer,

    #[error("invalid peer url '{0}'")]
    InvalidPeer(String),

    #[error("peer '{0}' is listed more than once")]
    DuplicatePeer(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("metrics port {0} is already the API port")]
    PortClash(u16),
}
