//! A single store node: state, components and the server loop.
//!
//! [`Node`] is built once from a validated [`NodeConfig`] and owns the two
//! pieces of shared mutable state (the record store and the peer table). The
//! components hold `Arc`s to them and are cheap to clone.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api;
use crate::client::PeerClient;
use crate::config::NodeConfig;
use crate::gateway::ReplicationGateway;
use crate::peer::PeerTable;
use crate::prober::LivenessProber;
use crate::store::LocalStore;
use crate::sync::AntiEntropySynchronizer;

pub struct Node {
    config: NodeConfig,
    store: Arc<LocalStore>,
    peers: Arc<PeerTable>,
    gateway: ReplicationGateway,
    prober: LivenessProber,
}

impl Node {
    pub fn new(config: NodeConfig) -> Result<Self> {
        let client = PeerClient::new(config.timeout).context("failed to build peer client")?;
        let addresses: Arc<[String]> = Arc::from(config.peers.clone());
        let store = Arc::new(LocalStore::new());
        let peers = Arc::new(PeerTable::new(addresses.iter().cloned()));

        let synchronizer = AntiEntropySynchronizer::new(Arc::clone(&store), client.clone());
        let gateway = ReplicationGateway::new(
            Arc::clone(&store),
            Arc::clone(&addresses),
            client.clone(),
        );
        let prober = LivenessProber::new(
            addresses,
            Arc::clone(&peers),
            client,
            synchronizer,
            config.ping_frequency,
        );

        Ok(Self {
            config,
            store,
            peers,
            gateway,
            prober,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn peers(&self) -> &Arc<PeerTable> {
        &self.peers
    }

    pub fn gateway(&self) -> &ReplicationGateway {
        &self.gateway
    }

    pub fn prober(&self) -> &LivenessProber {
        &self.prober
    }

    /// Starts the periodic probe loop on the current runtime.
    pub fn spawn_prober(&self) -> JoinHandle<()> {
        tokio::spawn(self.prober.clone().run())
    }

    /// Serves the HTTP API on `listener` until `shutdown` resolves.
    ///
    /// Does not start the prober; callers that want liveness tracking use
    /// [`Node::spawn_prober`] alongside.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().ok();
        info!(?addr, peers = ?self.config.peers, "node listening");

        axum::serve(listener, api::router(self.gateway.clone()))
            .with_graceful_shutdown(shutdown)
            .await
            .context("http server failed")?;

        info!("node stopped");
        Ok(())
    }
}

/// Binds the listener for `config.port` on all interfaces.
pub async fn bind(config: &NodeConfig) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

/// Completes on ctrl-c, or on SIGTERM where the platform has it.
///
/// The SIGTERM handler is registered by this call, not on first poll, so a
/// signal that arrives before the server starts waiting is not lost. Must be
/// called inside a tokio runtime.
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    #[cfg(unix)]
    let sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(err) => {
            warn!(error = ?err, "failed to install SIGTERM handler");
            None
        }
    };

    async move {
        #[cfg(unix)]
        {
            if let Some(mut sigterm) = sigterm {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
        }

        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
