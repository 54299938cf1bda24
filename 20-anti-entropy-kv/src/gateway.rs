//! Local writes, inbound replication and reads.
//!
//! Writes are weakly consistent: a write succeeds once it is in the local
//! store, and is then offered to every peer exactly once. Peers that miss it
//! catch up through anti-entropy when they are next seen coming back up.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::PeerClient;
use crate::error::StoreError;
use crate::metrics;
use crate::store::{LocalStore, Record};

#[derive(Debug, Clone)]
pub struct ReplicationGateway {
    store: Arc<LocalStore>,
    peers: Arc<[String]>,
    client: PeerClient,
}

/// Handles of the replication tasks spawned by one write.
///
/// Dropping it detaches the tasks; they still run to completion or timeout.
#[derive(Debug)]
pub struct FanOut {
    tasks: Vec<JoinHandle<()>>,
}

impl FanOut {
    /// Waits until every peer request has finished, whatever its outcome.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = ?err, "replication task did not complete");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl ReplicationGateway {
    pub fn new(store: Arc<LocalStore>, peers: Arc<[String]>, client: PeerClient) -> Self {
        Self {
            store,
            peers,
            client,
        }
    }

    /// Appends `record` locally, then sends it to every peer in the background.
    pub async fn store_key_value(&self, record: Record) -> FanOut {
        self.store.append(record.clone()).await;
        debug!(key = %record.key, "stored record locally");

        let record = Arc::new(record);
        let tasks = self
            .peers
            .iter()
            .map(|peer| {
                let peer = peer.clone();
                let record = Arc::clone(&record);
                let client = self.client.clone();
                tokio::spawn(async move {
                    replicate_to_peer(&client, &peer, &record).await;
                })
            })
            .collect();

        FanOut { tasks }
    }

    /// Appends a record received from a peer. No deduplication.
    pub async fn replicate_key_value(&self, record: Record) {
        debug!(key = %record.key, "accepted replicated record");
        self.store.append(record).await;
    }

    /// Replaces the local store with a peer's full store.
    pub async fn accept_replicate_all(&self, records: Vec<Record>) {
        info!(records = records.len(), "replacing local store with pushed store");
        self.store.replace_all(records).await;
    }

    pub async fn get_value(&self, key: &str) -> Option<String> {
        self.store.first_value(key).await
    }

    pub async fn digest(&self) -> Result<String, StoreError> {
        self.store.digest().await
    }
}

async fn replicate_to_peer(client: &PeerClient, peer: &str, record: &Record) {
    match client.replicate_record(peer, record).await {
        Ok(()) => {
            metrics::record_replication(peer, true);
            info!(peer = %peer, key = %record.key, "replicated record to peer");
        }
        Err(err) => {
            metrics::record_replication(peer, false);
            warn!(peer = %peer, key = %record.key, error = %err, "failed to replicate record");
        }
    }
}
