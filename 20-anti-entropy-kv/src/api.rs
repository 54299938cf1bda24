//! HTTP surface shared by clients and peers.
//!
//! | Route            | Method | Body / query              |
//! |------------------|--------|---------------------------|
//! | `/ping`          | GET    |                           |
//! | `/store`         | POST   | `{"key","value"}`         |
//! | `/replicate`     | POST   | `{"key","value"}`         |
//! | `/store/hash`    | GET    |                           |
//! | `/store/key`     | GET    | `?key=...`                |
//! | `/replicateAll`  | POST   | `[{"key","value"}, ...]`  |
//!
//! Bad bodies and queries are rejected by the axum extractors with a 4xx
//! before any handler runs; unsupported methods get a 405.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::client::{HashResponse, PingResponse};
use crate::gateway::ReplicationGateway;
use crate::store::Record;

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueResponse {
    pub value: String,
}

pub fn router(gateway: ReplicationGateway) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/store", post(store_key_value))
        .route("/replicate", post(replicate_key_value))
        .route("/store/hash", get(store_hash))
        .route("/store/key", get(get_value))
        .route("/replicateAll", post(accept_replicate_all))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse::ok())
}

async fn store_key_value(
    State(gateway): State<ReplicationGateway>,
    Json(record): Json<Record>,
) -> Response {
    // The fan-out keeps running after the handle is dropped.
    let _fan_out = gateway.store_key_value(record).await;
    message("key-value pair stored")
}

async fn replicate_key_value(
    State(gateway): State<ReplicationGateway>,
    Json(record): Json<Record>,
) -> Response {
    gateway.replicate_key_value(record).await;
    message("key-value pair replicated")
}

async fn accept_replicate_all(
    State(gateway): State<ReplicationGateway>,
    Json(records): Json<Vec<Record>>,
) -> Response {
    gateway.accept_replicate_all(records).await;
    message("store replaced")
}

async fn store_hash(State(gateway): State<ReplicationGateway>) -> Response {
    match gateway.digest().await {
        Ok(hash) => Json(HashResponse { hash }).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to compute store digest");
            error(StatusCode::INTERNAL_SERVER_ERROR, "failed to compute hash")
        }
    }
}

async fn get_value(
    State(gateway): State<ReplicationGateway>,
    Query(query): Query<KeyQuery>,
) -> Response {
    match gateway.get_value(&query.key).await {
        Some(value) => Json(ValueResponse { value }).into_response(),
        None => error(StatusCode::NOT_FOUND, "key not found"),
    }
}

fn message(text: &str) -> Response {
    Json(json!({ "message": text })).into_response()
}

fn error(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "error": text }))).into_response()
}
