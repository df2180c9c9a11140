//! Index management: reload from disk and background re-ingestion.

use crate::{
    types::{IndexStatusResponse, Result},
    AppState,
};
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::info;

/// Load the persisted index and swap it in
///
/// On failure the index being served stays in place.
pub async fn reload(State(state): State<AppState>) -> Result<Json<IndexStatusResponse>> {
    let config = state.config.clone();
    let entries = state
        .index
        .load_from(
            &config.ingestion.index_dir,
            config.models.embedding_dimensions,
        )
        .await?;

    Ok(Json(IndexStatusResponse {
        status: "loaded".to_string(),
        entries,
        dimensions: config.models.embedding_dimensions,
    }))
}

/// Start re-ingesting the configured sources in the background
///
/// Answers 202 once the run has been claimed, or 409 if one is already going.
/// The new index replaces the served one only if the run succeeds.
pub async fn ingest(State(state): State<AppState>) -> Result<(StatusCode, Json<Value>)> {
    let urls = state.config.ingestion.urls.clone();
    let count = urls.len();

    state
        .ingestion
        .spawn_ingest_and_swap(urls, state.index.clone())?;
    info!(urls = count, "Background ingestion started");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "urls": count })),
    ))
}
