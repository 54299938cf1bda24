use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use anti_entropy_kv::{
    config::NodeArgs,
    metrics,
    node::{Node, bind, shutdown_signal},
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = NodeArgs::parse().into_config()?;
    info!(
        port = config.port,
        peers = ?config.peers,
        ping_frequency = ?config.ping_frequency,
        timeout = ?config.timeout,
        metrics_port = ?config.metrics_port,
        "configuration loaded"
    );

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        metrics::install_prometheus(addr).context("failed to start metrics exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let node = Node::new(config)?;
    let listener = bind(node.config()).await?;
    let prober = node.spawn_prober();
    let shutdown = shutdown_signal();

    let result = node
        .serve_until(listener, async move {
            shutdown.await;
            info!("shutdown signal received");
        })
        .await;

    prober.abort();
    if let Err(err) = &result {
        warn!("node exited with error: {err:?}");
    }
    result
}
