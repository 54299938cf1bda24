//! Digest comparison and full-store repair.
//!
//! When a peer comes back, its store may have missed writes (or hold writes
//! this node never saw). The synchronizer compares digests and, if they
//! differ, overwrites the peer's store with ours. There is no merge: the
//! node that observes the up-transition wins.

use std::sync::Arc;

use tracing::info;

use crate::client::PeerClient;
use crate::error::SyncError;
use crate::metrics;
use crate::store::LocalStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Digests matched; nothing was sent.
    InSync,
    /// The peer's store was replaced with `records` records.
    Pushed { records: usize },
}

#[derive(Debug, Clone)]
pub struct AntiEntropySynchronizer {
    store: Arc<LocalStore>,
    client: PeerClient,
}

impl AntiEntropySynchronizer {
    pub fn new(store: Arc<LocalStore>, client: PeerClient) -> Self {
        Self { store, client }
    }

    /// Pushes the whole local store to `peer` if the two digests differ.
    ///
    /// Performs at most one push. Failures are returned, not retried.
    pub async fn sync_if_divergent(&self, peer: &str) -> Result<SyncOutcome, SyncError> {
        let (local, records) = self.store.digest_with_snapshot().await?;
        let remote = self
            .client
            .fetch_digest(peer)
            .await
            .map_err(SyncError::RemoteDigest)?;

        if local == remote {
            info!(peer = %peer, digest = %local, "store digest matches peer, no push needed");
            return Ok(SyncOutcome::InSync);
        }

        info!(
            peer = %peer,
            local = %local,
            remote = %remote,
            records = records.len(),
            "store digest differs from peer, pushing full store"
        );
        self.client
            .push_store(peer, &records)
            .await
            .map_err(SyncError::Push)?;
        metrics::record_sync_push(peer);
        info!(peer = %peer, records = records.len(), "replaced peer store");

        Ok(SyncOutcome::Pushed {
            records: records.len(),
        })
    }
}
