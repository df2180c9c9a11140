use crate::{types::HealthResponse, AppState};
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness plus the two things a request needs: an index and a gateway
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let gateway_reachable = matches!(
        tokio::time::timeout(PING_TIMEOUT, state.gateway.ping()).await,
        Ok(Ok(()))
    );
    let index_loaded = state.index.is_loaded();

    let status = if index_loaded && gateway_reachable {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        index_loaded,
        index_entries: state.index.len(),
        gateway_reachable,
    })
}

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "name": "docqa-server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "invoke": "POST /agent/invoke",
            "batch": "POST /agent/batch",
            "stream": "POST /agent/stream",
            "health": "GET /health",
            "reload_index": "POST /index/reload",
            "ingest": "POST /index/ingest",
        }
    }))
}
