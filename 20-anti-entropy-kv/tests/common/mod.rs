//! Helpers for running real nodes and scripted stub peers on localhost.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use anti_entropy_kv::{
    client::{HashResponse, PingResponse},
    config::NodeConfig,
    node::Node,
    store::Record,
};
use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

/// Binds an ephemeral localhost port and returns it with its base URL.
pub async fn bind_local() -> Result<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    Ok((listener, url))
}

/// A URL nothing is listening on.
pub async fn dead_url() -> Result<String> {
    let (listener, url) = bind_local().await?;
    drop(listener);
    Ok(url)
}

pub fn config(peers: Vec<String>) -> Result<NodeConfig> {
    Ok(NodeConfig::new(
        0,
        peers,
        Duration::from_secs(60),
        REQUEST_TIMEOUT,
    )?)
}

pub struct RunningNode {
    pub node: Arc<Node>,
    pub url: String,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl RunningNode {
    /// Serves a node on `listener`. The prober loop is not started; tests
    /// drive cycles explicitly through `probe_cycle`.
    pub fn start(listener: TcpListener, url: String, peers: Vec<String>) -> Result<Self> {
        let node = Arc::new(Node::new(config(peers)?)?);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let serving = Arc::clone(&node);
        let server = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            let _ = serving.serve_until(listener, shutdown).await;
        });

        Ok(Self {
            node,
            url,
            shutdown: Some(shutdown_tx),
            server: Some(server),
        })
    }

    pub async fn records(&self) -> Vec<Record> {
        self.node.store().snapshot().await
    }

    pub async fn digest(&self) -> String {
        self.node.store().digest().await.expect("digest")
    }

    /// Stops serving and waits until the listener is closed.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
    }
}

impl Drop for RunningNode {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// A ping delay long enough to trip `REQUEST_TIMEOUT`.
pub const PAST_DEADLINE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMode {
    Ok,
    Unavailable,
    NotOk,
    Slow(Duration),
}

/// How the stub answers `GET /store/hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    Digest,
    Status(StatusCode),
    Garbage,
}

/// A scripted peer that counts the anti-entropy requests it receives.
pub struct StubPeer {
    pub url: String,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
}

struct StubState {
    ping: Mutex<PingMode>,
    hash: Mutex<String>,
    hash_mode: Mutex<HashMode>,
    push_status: Mutex<StatusCode>,
    hash_fetches: AtomicUsize,
    pushes: AtomicUsize,
    pushed: Mutex<Vec<Vec<Record>>>,
    replicated: Mutex<Vec<Record>>,
}

impl StubPeer {
    pub async fn start(hash: &str) -> Result<Self> {
        let (listener, url) = bind_local().await?;
        let state = Arc::new(StubState {
            ping: Mutex::new(PingMode::Ok),
            hash: Mutex::new(hash.to_string()),
            hash_mode: Mutex::new(HashMode::Digest),
            push_status: Mutex::new(StatusCode::OK),
            hash_fetches: AtomicUsize::new(0),
            pushes: AtomicUsize::new(0),
            pushed: Mutex::new(Vec::new()),
            replicated: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/ping", get(stub_ping))
            .route("/store/hash", get(stub_hash))
            .route("/replicateAll", post(stub_replicate_all))
            .route("/replicate", post(stub_replicate))
            .with_state(Arc::clone(&state));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(Self {
            url,
            state,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn set_ping(&self, mode: PingMode) {
        *self.state.ping.lock().unwrap() = mode;
    }

    pub fn set_hash_mode(&self, mode: HashMode) {
        *self.state.hash_mode.lock().unwrap() = mode;
    }

    pub fn set_push_status(&self, status: StatusCode) {
        *self.state.push_status.lock().unwrap() = status;
    }

    pub fn hash_fetches(&self) -> usize {
        self.state.hash_fetches.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> usize {
        self.state.pushes.load(Ordering::SeqCst)
    }

    pub fn pushed(&self) -> Vec<Vec<Record>> {
        self.state.pushed.lock().unwrap().clone()
    }

    pub fn replicated(&self) -> Vec<Record> {
        self.state.replicated.lock().unwrap().clone()
    }
}

impl Drop for StubPeer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn stub_ping(State(state): State<Arc<StubState>>) -> Response {
    let mode = *state.ping.lock().unwrap();
    match mode {
        PingMode::Ok => Json(PingResponse::ok()).into_response(),
        PingMode::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        PingMode::NotOk => Json(PingResponse {
            status: "starting".to_string(),
        })
        .into_response(),
        PingMode::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(PingResponse::ok()).into_response()
        }
    }
}

async fn stub_hash(State(state): State<Arc<StubState>>) -> Response {
    state.hash_fetches.fetch_add(1, Ordering::SeqCst);
    let mode = *state.hash_mode.lock().unwrap();
    match mode {
        HashMode::Digest => {
            let hash = state.hash.lock().unwrap().clone();
            Json(HashResponse { hash }).into_response()
        }
        HashMode::Status(status) => status.into_response(),
        HashMode::Garbage => (
            [("content-type", "application/json")],
            "{\"digest\": 42",
        )
            .into_response(),
    }
}

async fn stub_replicate_all(
    State(state): State<Arc<StubState>>,
    Json(records): Json<Vec<Record>>,
) -> StatusCode {
    state.pushes.fetch_add(1, Ordering::SeqCst);
    state.pushed.lock().unwrap().push(records);
    *state.push_status.lock().unwrap()
}

async fn stub_replicate(
    State(state): State<Arc<StubState>>,
    Json(record): Json<Record>,
) -> StatusCode {
    state.replicated.lock().unwrap().push(record);
    StatusCode::OK
}

/// Polls `check` until it returns true or `deadline` passes.
pub async fn eventually<F, Fut>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    loop {
        if check().await {
            return true;
        }
        if start.elapsed() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
