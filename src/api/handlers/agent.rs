//! Pipeline endpoints: invoke, batch, and server-sent-event streaming.

use crate::{
    types::{
        BatchItem, BatchRequest, BatchResponse, InvokeRequest, InvokeResponse, Result,
        StageEventPayload,
    },
    workflows::StreamEvent,
    AppState,
};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use tracing::info;

/// Run the pipeline for one question
pub async fn invoke(
    State(state): State<AppState>,
    Json(payload): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>> {
    let output = state.executor.invoke(&payload.question).await?;
    Ok(Json(InvokeResponse { output }))
}

/// Run the pipeline for many questions; one result per question, in order
pub async fn batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchRequest>,
) -> Json<BatchResponse> {
    let results = state
        .executor
        .batch(&payload.questions)
        .await
        .into_iter()
        .map(BatchItem::from)
        .collect();
    Json(BatchResponse { results })
}

/// Stream one `stage` event per completed stage, then `end`
///
/// A failure produces a single `error` event before `end`. When the client
/// disconnects, axum drops the body stream and the remaining stages never run.
pub async fn stream(
    State(state): State<AppState>,
    Json(payload): Json<InvokeRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let mut events = state.executor.stream(&payload.question);

    let body = async_stream::stream! {
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Stage(stage) => {
                    yield Event::default()
                        .event("stage")
                        .json_data(StageEventPayload::from(&stage));
                }
                StreamEvent::Failed { stage, error } => {
                    info!(stage = ?stage, error = %error, "Streaming run failed");
                    yield Event::default().event("error").json_data(serde_json::json!({
                        "stage": stage.map(|s| s.name()),
                        "error": error.to_string(),
                        "kind": error.kind(),
                    }));
                }
            }
        }
        yield Ok(Event::default().event("end").data("[DONE]"));
    };

    Sse::new(body).keep_alive(KeepAlive::default())
}
