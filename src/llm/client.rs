//! Gateway client abstraction
//!
//! Every outbound model call (embeddings and chat completions) goes through a
//! [`GatewayClient`]. The HTTP implementation lives in [`super::gateway`];
//! tests substitute their own.

use crate::types::{Embedding, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Client for the remote embedding and completion service
///
/// Implementations make exactly one outbound call per method invocation and
/// never retry; callers decide whether a [`crate::types::AppError::Gateway`]
/// is worth another attempt.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Embed a non-empty batch of texts, returning one vector per input in
    /// input order. Every vector has [`Self::embedding_dimensions`] components.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Run a chat completion and return the assistant's text
    async fn complete(&self, prompt: &Prompt, settings: &ModelSettings) -> Result<String>;

    /// Check that the gateway answers at all
    async fn ping(&self) -> Result<()>;

    /// Dimension of vectors returned by [`Self::embed`]
    fn embedding_dimensions(&self) -> usize;
}

/// A two-message chat prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// System instructions, including any grounding context
    pub system: String,
    /// The user's message
    pub user: String,
}

/// Which completion model to call and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn from_config(models: &crate::utils::toml_config::ModelsConfig) -> Self {
        Self {
            model: models.completion.clone(),
            temperature: models.temperature,
            max_tokens: models.max_tokens,
        }
    }
}
