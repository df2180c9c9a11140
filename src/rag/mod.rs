//! Retrieval Augmented Generation (RAG) ingestion
//!
//! Turns a list of documentation URLs into a persisted vector index.
//!
//! # Module Structure
//!
//! - [`rag::fetch`](crate::rag::fetch) - HTTP fetching and HTML-to-text
//! - [`rag::chunker`](crate::rag::chunker) - Overlapping, boundary-aware chunking
//! - [`rag::embeddings`](crate::rag::embeddings) - Batched embedding through the gateway
//! - [`rag::ingest`](crate::rag::ingest) - The end-to-end ingestion run
//!
//! # Ingestion Pipeline
//!
//! 1. **Fetch** - Each URL is loaded; failures are logged and skipped
//! 2. **Chunk** - Documents are split into overlapping windows
//! 3. **Embed** - Chunks are embedded in bounded batches
//! 4. **Index** - Embeddings and chunk text are assembled into an index
//! 5. **Persist** - The index is staged and renamed into place
//!
//! # Example
//!
//! ```ignore
//! use docqa::rag::{fetch::HttpFetcher, ingest::IngestionPipeline};
//!
//! let pipeline = IngestionPipeline::from_config(&config, Arc::new(fetcher), gateway)?;
//! let report = pipeline.ingest_and_swap(&config.ingestion.urls, &handle).await?;
//! println!("indexed {} chunks", report.chunks);
//! ```

pub mod chunker;
pub mod embeddings;
pub mod fetch;
pub mod ingest;

pub use chunker::TextChunker;
pub use embeddings::EmbeddingService;
pub use fetch::{DocumentFetcher, HttpFetcher};
pub use ingest::{lock_path, IngestionPipeline, IngestionReport, SourceFailure};
