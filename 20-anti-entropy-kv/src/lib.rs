//! Peer-to-peer key-value node with liveness probing and anti-entropy repair.
//!
//! Each node keeps an append-ordered list of records in memory and knows a
//! fixed set of sibling nodes. Writes are applied locally and offered to
//! every sibling once. Separately, a prober pings the siblings on a fixed
//! interval; when one comes back after being unreachable, the node compares
//! store digests with it and, if they differ, overwrites its store with ours.
//!
//! - [`store`] holds the records and computes the digest.
//! - [`peer`] tracks per-peer liveness and the one-shot sync flag.
//! - [`prober`] runs the probe cycles and detects up-transitions.
//! - [`sync`] compares digests and pushes the full store.
//! - [`gateway`] handles writes, inbound replication and lookups.
//! - [`client`] makes the outbound HTTP calls; [`api`] serves the inbound ones.
//! - [`node`] wires everything together; [`config`] parses the command line.
//! - [`metrics`] counts probes, pushes and replication attempts.
//!
//! # Wire format
//!
//! Records travel as `{"key": string, "value": string}`. The store digest is
//! the lowercase hex SHA-256 of the compact JSON array of all records in
//! append order (`[]` when empty), so the same records in another order hash
//! differently. A peer exposes it as `{"hash": ...}` on `GET /store/hash`.
//!
//! | Route | Body | Effect |
//! |---|---|---|
//! | `GET /ping` | - | `{"status":"ok"}` |
//! | `POST /store` | record | append locally, offer to every peer once |
//! | `POST /replicate` | record | append locally, no fan-out |
//! | `POST /replicateAll` | array of records | replace the whole store |
//! | `GET /store/hash` | - | current digest |
//! | `GET /store/key?key=K` | - | first value stored under `K` |
//!
//! # Running a cluster
//!
//! ```text
//! kv-node --port 8001 --peers http://localhost:8002,http://localhost:8003 --ping-freq 2 --timeout 1
//! kv-node --port 8002 --peers http://localhost:8001,http://localhost:8003 --ping-freq 2 --timeout 1
//! kv-node --port 8003 --peers http://localhost:8001,http://localhost:8002 --ping-freq 2 --timeout 1
//! ```
//!
//! Add `--metrics-port` to serve the counters for Prometheus. `RUST_LOG=debug`
//! shows per-request traces.
//!
//! # Limitations
//!
//! The full-store push is an overwrite, not a merge: writes only the
//! recovering node saw are lost. Peer membership is fixed at startup and
//! nothing is persisted.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod node;
pub mod peer;
pub mod prober;
pub mod store;
pub mod sync;
