//! Outbound HTTP calls to sibling nodes.
//!
//! Every call shares one `reqwest::Client` whose timeout bounds the whole
//! request, so a slow peer costs at most one deadline per call.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::PeerError;
use crate::peer::ProbeOutcome;
use crate::store::Record;

/// Body of `GET /ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

impl PingResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Body of `GET /store/hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashResponse {
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct PeerClient {
    http: Client,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Probes `peer`. Never fails; every problem is folded into the outcome.
    ///
    /// Only a transport failure or the deadline makes a peer `Down`. A peer
    /// that answers with an error status is reachable and reported as
    /// `Degraded`.
    pub async fn ping(&self, peer: &str) -> ProbeOutcome {
        let response = match self.http.get(format!("{peer}/ping")).send().await {
            Ok(response) => response,
            Err(err) => return ProbeOutcome::Down(err.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::Degraded(format!("status {status}"));
        }

        match response.json::<PingResponse>().await {
            Ok(body) if body.status == "ok" => ProbeOutcome::Up,
            Ok(body) => ProbeOutcome::Degraded(format!("status body '{}'", body.status)),
            Err(err) => ProbeOutcome::Degraded(format!("unreadable ping body: {err}")),
        }
    }

    pub async fn fetch_digest(&self, peer: &str) -> Result<String, PeerError> {
        let response = self
            .http
            .get(format!("{peer}/store/hash"))
            .send()
            .await
            .map_err(|source| PeerError::Transport {
                peer: peer.to_string(),
                source,
            })?;
        let response = ensure_success(peer, response)?;
        let body: HashResponse = response.json().await.map_err(|source| PeerError::Body {
            peer: peer.to_string(),
            source,
        })?;
        Ok(body.hash)
    }

    /// Overwrites the peer's store with `records`.
    pub async fn push_store(&self, peer: &str, records: &[Record]) -> Result<(), PeerError> {
        self.post_json(peer, "/replicateAll", records).await
    }

    pub async fn replicate_record(&self, peer: &str, record: &Record) -> Result<(), PeerError> {
        self.post_json(peer, "/replicate", record).await
    }

    async fn post_json<T>(&self, peer: &str, path: &str, body: &T) -> Result<(), PeerError>
    where
        T: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(format!("{peer}{path}"))
            .json(body)
            .send()
            .await
            .map_err(|source| PeerError::Transport {
                peer: peer.to_string(),
                source,
            })?;
        ensure_success(peer, response)?;
        Ok(())
    }
}

fn ensure_success(peer: &str, response: reqwest::Response) -> Result<reqwest::Response, PeerError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PeerError::Status {
            peer: peer.to_string(),
            status,
        })
    }
}
