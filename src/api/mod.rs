//! HTTP API Handlers and Routes
//!
//! The serving shell over the question-answering pipeline, built on Axum.
//!
//! # API Endpoints
//!
//! ## Agent (`/agent`)
//! - `POST /agent/invoke` - Answer one question, returns the final state
//! - `POST /agent/batch` - Answer many questions, results in input order
//! - `POST /agent/stream` - Server-sent events, one per completed stage
//!
//! ## Index (`/index`)
//! - `POST /index/reload` - Load the persisted index and swap it in
//! - `POST /index/ingest` - Re-ingest in the background (202, or 409 if busy)
//!
//! ## Health
//! - `GET /health` - Index and gateway status
//! - `GET /` - Endpoint listing

/// Request handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::{build_app, create_router};
