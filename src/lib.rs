//! # DocQA - Retrieval-augmented documentation Q&A
//!
//! Answers questions about a documentation set by retrieving the most similar
//! passages from a local vector index and asking a completion model to answer
//! from them alone.
//!
//! ## Overview
//!
//! DocQA can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `docqa-server` binary
//! 2. **As a library** - Import components into your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use docqa::{DocQaConfig, HttpGatewayClient, IndexHandle, PipelineExecutor};
//! use std::sync::Arc;
//!
//! let config = DocQaConfig::load_or_default("docqa.toml")?;
//!
//! let gateway = Arc::new(HttpGatewayClient::from_config(&config)?);
//! let index = IndexHandle::empty();
//! index
//!     .load_from(&config.ingestion.index_dir, config.models.embedding_dimensions)
//!     .await?;
//!
//! let executor = PipelineExecutor::from_config(&config, index, gateway);
//! let state = executor.invoke("How do I enable tracing?").await?;
//! println!("{}", state.formatted_output().unwrap_or_default());
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`db`] - The shared, swappable index handle
//! - [`llm`] - Gateway client for embeddings and completions
//! - [`rag`] - Fetching, chunking, embedding, and ingestion
//! - [`workflows`] - Pipeline stages and executor
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Live index handle.
pub mod db;
/// Gateway client abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) ingestion.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;
/// Question-answering pipeline.
pub mod workflows;

// Re-export commonly used types
pub use db::IndexHandle;
pub use llm::{GatewayClient, HttpGatewayClient};
pub use rag::{DocumentFetcher, HttpFetcher, IngestionPipeline};
pub use types::{AppError, Result};
pub use utils::toml_config::DocQaConfig;
pub use workflows::{PipelineExecutor, PipelineState};

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration the server was started with
    pub config: Arc<DocQaConfig>,
    /// The index requests are served from
    pub index: IndexHandle,
    /// Retrieve → generate → format pipeline over `index`
    pub executor: Arc<PipelineExecutor>,
    /// Embedding and completion gateway
    pub gateway: Arc<dyn GatewayClient>,
    /// Re-ingestion that publishes into `index` on success
    pub ingestion: Arc<IngestionPipeline>,
}

impl AppState {
    /// Wire the pipeline and ingestion around a shared index handle
    pub fn new(
        config: Arc<DocQaConfig>,
        index: IndexHandle,
        gateway: Arc<dyn GatewayClient>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Result<Self> {
        let executor = PipelineExecutor::from_config(&config, index.clone(), gateway.clone());
        let ingestion = IngestionPipeline::from_config(&config, fetcher, gateway.clone())?;

        Ok(Self {
            config,
            index,
            executor: Arc::new(executor),
            gateway,
            ingestion: Arc::new(ingestion),
        })
    }
}
