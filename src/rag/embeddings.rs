use crate::llm::GatewayClient;
use crate::types::{AppError, Embedding, Result};
use std::sync::Arc;
use tracing::debug;

/// Batches embedding requests so no single gateway call exceeds `batch_size`
/// inputs.
#[derive(Clone)]
pub struct EmbeddingService {
    gateway: Arc<dyn GatewayClient>,
    batch_size: usize,
}

impl EmbeddingService {
    pub fn new(gateway: Arc<dyn GatewayClient>, batch_size: usize) -> Self {
        Self {
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.gateway.embedding_dimensions()
    }

    /// Embed texts in order, one gateway call per batch. Returns the vectors
    /// and the number of calls made.
    pub async fn embed_all(&self, texts: &[String]) -> Result<(Vec<Embedding>, usize)> {
        let mut vectors = Vec::with_capacity(texts.len());
        let mut calls = 0;

        for batch in texts.chunks(self.batch_size) {
            let embedded = self.gateway.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(AppError::gateway(
                    None,
                    format!(
                        "expected {} embeddings, gateway returned {}",
                        batch.len(),
                        embedded.len()
                    ),
                ));
            }
            vectors.extend(embedded);
            calls += 1;
            debug!(batch = calls, embedded = vectors.len(), total = texts.len(), "Embedded batch");
        }

        Ok((vectors, calls))
    }

    /// Embed a single query string
    pub async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.gateway
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::gateway(None, "gateway returned no embedding for query"))
    }
}
