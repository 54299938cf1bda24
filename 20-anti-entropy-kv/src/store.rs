//! In-memory, append-ordered record storage.
//!
//! Every node owns exactly one [`LocalStore`]. Unlike a map, the store keeps
//! every record it is given, in the order it was given, because that order is
//! what the anti-entropy digest is computed over.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::StoreError;

/// A single key/value pair.
///
/// Field order matters: it fixes the canonical JSON encoding
/// (`{"key":..,"value":..}`) that feeds the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Append-only sequence of records guarded by an async mutex.
///
/// All reads and writes go through the lock, so concurrent appends from the
/// HTTP handlers are serialized and the digest at any quiescent point is
/// well defined.
#[derive(Debug, Default)]
pub struct LocalStore {
    records: Mutex<Vec<Record>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Duplicate keys are kept.
    pub async fn append(&self, record: Record) {
        self.records.lock().await.push(record);
    }

    /// Replaces the whole store with `records`, preserving their order.
    ///
    /// Applying the same sequence twice leaves the same store.
    pub async fn replace_all(&self, records: Vec<Record>) {
        *self.records.lock().await = records;
    }

    /// Returns the value of the first record, in append order, whose key matches.
    pub async fn first_value(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .await
            .iter()
            .find(|record| record.key == key)
            .map(|record| record.value.clone())
    }

    /// Clones the current record sequence.
    pub async fn snapshot(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Hex SHA-256 of the canonical encoding of the current sequence.
    pub async fn digest(&self) -> Result<String, StoreError> {
        let records = self.records.lock().await;
        digest_records(&records)
    }

    /// Digest and contents taken under a single lock acquisition, so the
    /// records pushed to a peer are exactly the ones that were hashed.
    pub async fn digest_with_snapshot(&self) -> Result<(String, Vec<Record>), StoreError> {
        let records = self.records.lock().await;
        let digest = digest_records(&records)?;
        Ok((digest, records.clone()))
    }
}

/// Canonical encoding: compact JSON array of records in order.
pub fn encode_records(records: &[Record]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(records)?)
}

pub fn digest_records(records: &[Record]) -> Result<String, StoreError> {
    let encoded = encode_records(records)?;
    Ok(hex::encode(Sha256::digest(&encoded)))
}
