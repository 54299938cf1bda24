//! Counter hooks for probes, pushes and replication.
//!
//! These only talk to the `metrics` facade. Without an installed recorder
//! every call is a no-op; the binary installs the Prometheus exporter when
//! `--metrics-port` is given.
//!
//! All counters end in `_total` and carry a `peer` label.

use std::net::SocketAddr;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Installs the global Prometheus recorder and serves `/metrics` on `addr`.
///
/// Must be called from inside a tokio runtime, at most once per process.
pub fn install_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("kv_probe_attempts_total", "Liveness probes sent to a peer");
    describe_counter!("kv_probe_success_total", "Probes answered with status ok");
    describe_counter!("kv_probe_failures_total", "Probes that did not find the peer up");
    describe_counter!("kv_sync_pushes_total", "Whole-store pushes accepted by a peer");
    describe_counter!("kv_replication_total", "Single-record replication attempts");
    Ok(())
}

pub fn record_probe_attempt(peer: &str) {
    counter!("kv_probe_attempts_total", "peer" => peer.to_string()).increment(1);
}

pub fn record_probe_success(peer: &str) {
    counter!("kv_probe_success_total", "peer" => peer.to_string()).increment(1);
}

pub fn record_probe_failure(peer: &str) {
    counter!("kv_probe_failures_total", "peer" => peer.to_string()).increment(1);
}

/// A whole-store push completed against `peer`.
pub fn record_sync_push(peer: &str) {
    counter!("kv_sync_pushes_total", "peer" => peer.to_string()).increment(1);
}

pub fn record_replication(peer: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("kv_replication_total", "peer" => peer.to_string(), "status" => status).increment(1);
}
