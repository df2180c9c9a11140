//! API request handlers.

/// Invoke, batch, and streaming pipeline handlers.
pub mod agent;
/// Health and service info.
pub mod health;
/// Index reload and re-ingestion.
pub mod index;
