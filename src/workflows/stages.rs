//! The three pipeline stages
//!
//! Each stage declares the state fields it reads and the single field it
//! writes; the executor checks both around every run.

use crate::db::{hit_chunk, IndexHandle};
use crate::llm::{GatewayClient, ModelSettings, Prompt};
use crate::rag::embeddings::EmbeddingService;
use crate::types::{Chunk, Result};
use crate::workflows::state::{PipelineState, StateField};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Separator between retrieved passages in the context string
pub const CONTEXT_SEPARATOR: &str = "\n\n";

const SYSTEM_PROMPT: &str = "You are a helpful documentation expert.\n\
Use the provided documentation to answer the user's question accurately and concisely.\n\
Answer only from the documentation below. If the documentation doesn't contain enough information, say so.\n\
\n\
Documentation:\n";

const BANNER_WIDTH: usize = 62;
const BANNER_TITLE: &str = "DOCUMENTATION Q&A AGENT";

/// Which stage an event or error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Retrieve,
    Generate,
    Format,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Retrieve => "retrieve",
            StageKind::Generate => "generate",
            StageKind::Format => "format",
        }
    }
}

/// One step of the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Fields that must be set before the stage runs
    fn reads(&self) -> &'static [StateField];

    /// The one field the stage's output is written to
    fn writes(&self) -> StateField;

    /// Compute the value for [`Self::writes`] from the current state
    async fn run(&self, state: &PipelineState) -> Result<String>;
}

// ============= Retrieve =============

/// Embeds the question and joins the top-k passages into a context string
pub struct RetrieveStage {
    index: IndexHandle,
    embeddings: EmbeddingService,
    k: usize,
}

impl RetrieveStage {
    pub fn new(index: IndexHandle, gateway: Arc<dyn GatewayClient>, k: usize) -> Self {
        Self {
            index,
            embeddings: EmbeddingService::new(gateway, 1),
            k,
        }
    }

    /// Top-k chunks for `question`, best first
    ///
    /// Fails with [`crate::types::AppError::IndexNotLoaded`] before any
    /// gateway call when no index has been published.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Chunk>> {
        let index = self.index.current()?;
        let query = self.embeddings.embed_query(question).await?;
        let hits = index.search(&query, self.k)?;
        debug!(k = self.k, hits = hits.len(), "Retrieved passages");
        Ok(hits.iter().map(hit_chunk).collect())
    }
}

#[async_trait]
impl Stage for RetrieveStage {
    fn kind(&self) -> StageKind {
        StageKind::Retrieve
    }

    fn reads(&self) -> &'static [StateField] {
        &[StateField::Question]
    }

    fn writes(&self) -> StateField {
        StateField::Context
    }

    async fn run(&self, state: &PipelineState) -> Result<String> {
        let chunks = self.retrieve(state.require(StateField::Question)?).await?;
        Ok(chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR))
    }
}

// ============= Generate =============

/// Asks the completion model to answer from the retrieved context only
pub struct GenerateStage {
    gateway: Arc<dyn GatewayClient>,
    settings: ModelSettings,
}

impl GenerateStage {
    pub fn new(gateway: Arc<dyn GatewayClient>, settings: ModelSettings) -> Self {
        Self { gateway, settings }
    }
}

/// The grounding prompt for a question and its retrieved context
pub fn build_prompt(question: &str, context: &str) -> Prompt {
    Prompt {
        system: format!("{}{}", SYSTEM_PROMPT, context),
        user: question.to_string(),
    }
}

#[async_trait]
impl Stage for GenerateStage {
    fn kind(&self) -> StageKind {
        StageKind::Generate
    }

    fn reads(&self) -> &'static [StateField] {
        &[StateField::Question, StateField::Context]
    }

    fn writes(&self) -> StateField {
        StateField::Answer
    }

    async fn run(&self, state: &PipelineState) -> Result<String> {
        let prompt = build_prompt(
            state.require(StateField::Question)?,
            state.require(StateField::Context)?,
        );
        self.gateway.complete(&prompt, &self.settings).await
    }
}

// ============= Format =============

/// Wraps question and answer in the final boxed layout
pub struct FormatStage;

/// Render the final response. Pure and byte-deterministic.
pub fn format_output(question: &str, answer: &str) -> String {
    let rule = "═".repeat(BANNER_WIDTH);
    let pad = BANNER_WIDTH.saturating_sub(BANNER_TITLE.len());
    let left = pad / 2;
    let title = format!(
        "{}{}{}",
        " ".repeat(left),
        BANNER_TITLE,
        " ".repeat(pad - left)
    );

    format!(
        "╔{rule}╗\n║{title}║\n╚{rule}╝\n\nQuestion:\n{question}\n\nAnswer:\n{answer}\n\n{rule}\n",
        rule = rule,
        title = title,
        question = question.trim(),
        answer = answer.trim(),
    )
}

#[async_trait]
impl Stage for FormatStage {
    fn kind(&self) -> StageKind {
        StageKind::Format
    }

    fn reads(&self) -> &'static [StateField] {
        &[StateField::Question, StateField::Answer]
    }

    fn writes(&self) -> StateField {
        StateField::FormattedOutput
    }

    async fn run(&self, state: &PipelineState) -> Result<String> {
        Ok(format_output(
            state.require(StateField::Question)?,
            state.require(StateField::Answer)?,
        ))
    }
}
