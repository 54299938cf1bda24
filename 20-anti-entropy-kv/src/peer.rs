//! Per-peer liveness bookkeeping.
//!
//! The table is created from the configured peer set and never grows or
//! shrinks. Each entry is a two-state machine (`Down` initially, `Up`) plus a
//! one-shot flag recording that the current up-period already triggered an
//! anti-entropy attempt.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// Result of one liveness probe against one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx with `{"status":"ok"}`.
    Up,
    /// The peer answered, but not with a 2xx `{"status":"ok"}`.
    Degraded(String),
    /// Transport error or timeout.
    Down(String),
}

impl ProbeOutcome {
    pub fn is_up(&self) -> bool {
        matches!(self, ProbeOutcome::Up)
    }
}

/// What applying a probe outcome did to a peer's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Down -> Up; the caller owes the peer one sync attempt.
    CameUp,
    /// Up -> Down; the one-shot flag was cleared.
    WentDown,
    /// Up -> Up, Down -> Down, degraded probes and unknown peers.
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStatus {
    pub alive: bool,
    pub transition_logged: bool,
}

#[derive(Debug)]
struct Inner {
    peers: HashMap<String, PeerStatus>,
    all_up_announced: bool,
}

/// Lock-guarded liveness state for the fixed peer set.
#[derive(Debug)]
pub struct PeerTable {
    inner: Mutex<Inner>,
}

impl PeerTable {
    pub fn new<I, S>(peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers = peers
            .into_iter()
            .map(|peer| (peer.into(), PeerStatus::default()))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                peers,
                all_up_announced: false,
            }),
        }
    }

    /// Applies a probe outcome to `peer` and reports the resulting transition.
    ///
    /// Degraded outcomes leave both flags untouched so a flapping status code
    /// or body cannot cause repeated full-store pushes. Addresses outside the
    /// configured set are ignored.
    pub async fn observe(&self, peer: &str, outcome: &ProbeOutcome) -> Transition {
        let mut inner = self.inner.lock().await;
        let Some(status) = inner.peers.get_mut(peer) else {
            return Transition::Unchanged;
        };

        match outcome {
            ProbeOutcome::Up => {
                status.alive = true;
                if status.transition_logged {
                    Transition::Unchanged
                } else {
                    status.transition_logged = true;
                    Transition::CameUp
                }
            }
            ProbeOutcome::Down(_) => {
                let was_up = status.alive || status.transition_logged;
                status.alive = false;
                status.transition_logged = false;
                if was_up {
                    Transition::WentDown
                } else {
                    Transition::Unchanged
                }
            }
            ProbeOutcome::Degraded(_) => Transition::Unchanged,
        }
    }

    /// Records whether every peer was up in the cycle that just finished.
    ///
    /// Returns `true` exactly once per convergence; any cycle with a peer not
    /// up re-arms it.
    pub async fn finish_cycle(&self, all_up: bool) -> bool {
        let mut inner = self.inner.lock().await;
        if !all_up {
            inner.all_up_announced = false;
            return false;
        }
        if inner.all_up_announced {
            return false;
        }
        inner.all_up_announced = true;
        true
    }

    pub async fn status(&self, peer: &str) -> Option<PeerStatus> {
        self.inner.lock().await.peers.get(peer).copied()
    }

    /// Copy of every entry, sorted by address.
    pub async fn snapshot(&self) -> Vec<(String, PeerStatus)> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<_> = inner
            .peers
            .iter()
            .map(|(peer, status)| (peer.clone(), *status))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
