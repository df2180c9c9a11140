//! HTTP API tests using axum-test with a mocked gateway and fetcher.

mod common;

use async_trait::async_trait;
use axum_test::TestServer;
use common::mocks::{
    index_of, test_config, MockFetcher, MockGateway, EVALUATION_PAGE, TRACING_PAGE,
};
use docqa::api::build_app;
use docqa::rag::{lock_path, DocumentFetcher};
use docqa::types::{Document, Result};
use docqa::{AppState, IndexHandle};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

const PASSAGES: [&str; 3] = [
    "Tracing captures every step of a run",
    "Datasets hold examples for evaluation",
    "Tracing projects group related runs",
];

fn pages() -> MockFetcher {
    MockFetcher::new()
        .with_page("https://docs.example.com/tracing", TRACING_PAGE)
        .with_page("https://docs.example.com/evaluation", EVALUATION_PAGE)
}

fn app_state(
    dir: &Path,
    index: IndexHandle,
    gateway: Arc<MockGateway>,
    fetcher: Arc<dyn DocumentFetcher>,
) -> AppState {
    AppState::new(Arc::new(test_config(dir)), index, gateway, fetcher).unwrap()
}

fn server(state: AppState) -> TestServer {
    TestServer::new(build_app(state)).unwrap()
}

fn loaded_server(dir: &Path) -> (TestServer, Arc<MockGateway>) {
    let gateway = Arc::new(MockGateway::new());
    let index = IndexHandle::with_index(index_of(&gateway, &PASSAGES));
    let state = app_state(dir, index, gateway.clone(), Arc::new(pages()));
    (server(state), gateway)
}

/// Event names of an SSE body, in order
fn event_names(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("event:"))
        .map(|name| name.trim().to_string())
        .collect()
}

// ============= Health =============

#[tokio::test]
async fn test_health_is_degraded_without_index() {
    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let state = app_state(temp.path(), IndexHandle::empty(), gateway, Arc::new(pages()));

    let response = server(state).get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["index_loaded"], false);
    assert_eq!(body["index_entries"], 0);
    assert_eq!(body["gateway_reachable"], true);
}

#[tokio::test]
async fn test_health_is_healthy_with_index_and_gateway() {
    let temp = TempDir::new().unwrap();
    let (server, _) = loaded_server(temp.path());

    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["index_entries"], 3);
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let temp = TempDir::new().unwrap();
    let (server, _) = loaded_server(temp.path());

    let body: Value = server.get("/").await.json();
    assert_eq!(body["endpoints"]["invoke"], "POST /agent/invoke");
}

// ============= Agent =============

#[tokio::test]
async fn test_invoke_returns_final_state() {
    let temp = TempDir::new().unwrap();
    let (server, gateway) = loaded_server(temp.path());

    let response = server
        .post("/agent/invoke")
        .json(&json!({ "question": "How does tracing work?" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let output = &body["output"];
    assert_eq!(output["question"], "How does tracing work?");
    assert!(output["context"].as_str().unwrap().contains("Tracing"));
    assert!(output["formatted_output"]
        .as_str()
        .unwrap()
        .contains("Answer:\nLangSmith records every step"));
    assert_eq!(output["steps"].as_array().unwrap().len(), 3);
    assert_eq!(gateway.complete_calls(), 1);
}

#[tokio::test]
async fn test_invoke_without_index_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let state = app_state(
        temp.path(),
        IndexHandle::empty(),
        gateway.clone(),
        Arc::new(pages()),
    );

    let response = server(state)
        .post("/agent/invoke")
        .json(&json!({ "question": "What is LangSmith?" }))
        .await;

    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["kind"], "index_not_loaded");
    assert_eq!(gateway.embed_calls(), 0);
}

#[tokio::test]
async fn test_invoke_rejects_blank_question() {
    let temp = TempDir::new().unwrap();
    let (server, _) = loaded_server(temp.path());

    let response = server
        .post("/agent/invoke")
        .json(&json!({ "question": "  " }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_batch_keeps_order_with_error_items() {
    let temp = TempDir::new().unwrap();
    let (server, _) = loaded_server(temp.path());

    let response = server
        .post("/agent/batch")
        .json(&json!({ "questions": ["tracing", "", "datasets"] }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["output"]["question"], "tracing");
    assert_eq!(results[1]["kind"], "invalid_input");
    assert!(results[1]["error"].is_string());
    assert_eq!(results[2]["output"]["question"], "datasets");
}

#[tokio::test]
async fn test_stream_emits_stage_events_then_end() {
    let temp = TempDir::new().unwrap();
    let (server, _) = loaded_server(temp.path());

    let response = server
        .post("/agent/stream")
        .json(&json!({ "question": "tracing" }))
        .await;
    response.assert_status_ok();

    let text = response.text();
    assert_eq!(event_names(&text), vec!["stage", "stage", "stage", "end"]);

    let retrieve = text.find("\"stage\":\"retrieve\"").unwrap();
    let generate = text.find("\"stage\":\"generate\"").unwrap();
    let format = text.find("\"stage\":\"format\"").unwrap();
    assert!(retrieve < generate && generate < format);
}

#[tokio::test]
async fn test_stream_failure_sends_error_event() {
    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let state = app_state(temp.path(), IndexHandle::empty(), gateway, Arc::new(pages()));

    let text = server(state)
        .post("/agent/stream")
        .json(&json!({ "question": "tracing" }))
        .await
        .text();

    assert_eq!(event_names(&text), vec!["error", "end"]);
    assert!(text.contains("index_not_loaded"));
}

// ============= Index =============

#[tokio::test]
async fn test_reload_without_persisted_index_is_not_found() {
    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let state = app_state(
        &temp.path().join("index"),
        IndexHandle::empty(),
        gateway,
        Arc::new(pages()),
    );

    let response = server(state).post("/index/reload").await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["kind"], "index_not_found");
}

#[tokio::test]
async fn test_reload_swaps_in_persisted_index() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("index");
    let gateway = Arc::new(MockGateway::new());
    let handle = IndexHandle::empty();
    let state = app_state(&dir, handle.clone(), gateway.clone(), Arc::new(pages()));

    let urls = state.config.ingestion.urls.clone();
    let (_, report) = state.ingestion.ingest(&urls).await.unwrap();
    assert!(!handle.is_loaded());

    let response = server(state).post("/index/reload").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["entries"], report.chunks);
    assert!(handle.is_loaded());
}

/// Holds every fetch until the test releases it
struct GatedFetcher {
    gate: Arc<Semaphore>,
    inner: MockFetcher,
}

#[async_trait]
impl DocumentFetcher for GatedFetcher {
    async fn fetch(&self, url: &str) -> Result<Document> {
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.fetch(url).await
    }
}

#[tokio::test]
async fn test_background_ingest_accepts_once_and_swaps_on_success() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("index");
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(GatedFetcher {
        gate: gate.clone(),
        inner: pages(),
    });
    let handle = IndexHandle::empty();
    let state = app_state(&dir, handle.clone(), Arc::new(MockGateway::new()), fetcher);
    let server = server(state);

    server
        .post("/index/ingest")
        .await
        .assert_status(axum::http::StatusCode::ACCEPTED);
    server
        .post("/index/ingest")
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);

    gate.add_permits(10);
    for _ in 0..100 {
        if handle.is_loaded() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(handle.is_loaded());

    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_background_ingest_conflicts_with_locked_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("index");
    let holder = std::fs::File::create(lock_path(&dir)).unwrap();
    holder.try_lock().unwrap();

    let gateway = Arc::new(MockGateway::new());
    let state = app_state(&dir, IndexHandle::empty(), gateway.clone(), Arc::new(pages()));

    let response = server(state).post("/index/ingest").await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["kind"], "ingestion_in_progress");
    assert_eq!(gateway.embed_calls(), 0);
}
