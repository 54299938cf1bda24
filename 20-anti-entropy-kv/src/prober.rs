//! Periodic liveness probing.
//!
//! Every cycle probes all peers at once. A peer whose probe finds it up for
//! the first time since it was last seen down gets exactly one anti-entropy
//! attempt, run inline by that peer's probe future so two pushes to the same
//! peer never overlap on this path.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::client::PeerClient;
use crate::metrics;
use crate::peer::{PeerTable, ProbeOutcome, Transition};
use crate::sync::{AntiEntropySynchronizer, SyncOutcome};

#[derive(Debug, Clone)]
pub struct LivenessProber {
    peers: Arc<[String]>,
    table: Arc<PeerTable>,
    client: PeerClient,
    synchronizer: AntiEntropySynchronizer,
    frequency: Duration,
}

impl LivenessProber {
    pub fn new(
        peers: Arc<[String]>,
        table: Arc<PeerTable>,
        client: PeerClient,
        synchronizer: AntiEntropySynchronizer,
        frequency: Duration,
    ) -> Self {
        Self {
            peers,
            table,
            client,
            synchronizer,
            frequency,
        }
    }

    /// Runs probe cycles forever, one every `frequency`.
    ///
    /// The first cycle starts one period after the call. A cycle that
    /// overruns delays the next one instead of bursting to catch up.
    pub async fn run(self) {
        let mut ticker = interval(self.frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.probe_cycle().await;
        }
    }

    /// Probes every peer concurrently and applies the outcomes.
    ///
    /// Returns the outcome per peer in configuration order.
    pub async fn probe_cycle(&self) -> Vec<ProbeOutcome> {
        let probes = self.peers.iter().map(|peer| self.probe_peer(peer));
        let outcomes = join_all(probes).await;

        let all_up = outcomes.iter().all(ProbeOutcome::is_up);
        if self.table.finish_cycle(all_up).await {
            info!(peers = self.peers.len(), "all peers are up");
        }

        outcomes
    }

    async fn probe_peer(&self, peer: &str) -> ProbeOutcome {
        metrics::record_probe_attempt(peer);
        let outcome = self.client.ping(peer).await;
        if outcome.is_up() {
            metrics::record_probe_success(peer);
        } else {
            metrics::record_probe_failure(peer);
        }

        match (self.table.observe(peer, &outcome).await, &outcome) {
            (Transition::CameUp, _) => {
                info!(peer = %peer, "peer is up");
                self.reconcile(peer).await;
            }
            (Transition::WentDown, ProbeOutcome::Down(reason)) => {
                warn!(peer = %peer, reason = %reason, "peer went down");
            }
            (_, ProbeOutcome::Down(reason)) => {
                debug!(peer = %peer, reason = %reason, "peer still down");
            }
            (_, ProbeOutcome::Degraded(reason)) => {
                warn!(peer = %peer, reason = %reason, "peer responded but is not ok");
            }
            (_, ProbeOutcome::Up) => {}
        }

        outcome
    }

    async fn reconcile(&self, peer: &str) {
        match self.synchronizer.sync_if_divergent(peer).await {
            Ok(SyncOutcome::InSync) => {}
            Ok(SyncOutcome::Pushed { records }) => {
                debug!(peer = %peer, records, "anti-entropy push complete");
            }
            Err(err) => {
                warn!(peer = %peer, error = %err, "anti-entropy attempt abandoned");
            }
        }
    }
}
