//! Mock implementations for testing.
//!
//! A gateway and a fetcher that never touch the network, shared across the
//! integration test files.

use async_trait::async_trait;
use docqa::db::chunk_entry;
use docqa::llm::{GatewayClient, ModelSettings, Prompt};
use docqa::rag::DocumentFetcher;
use docqa::types::{AppError, Chunk, Document, Embedding, Result};
use docqa::utils::toml_config::DocQaConfig;
use docqa_vector::VectorIndex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const TEST_DIMS: usize = 64;

/// Gateway with deterministic bag-of-words embeddings and canned answers.
///
/// Texts sharing words land close together, so retrieval order is
/// predictable. Every call is counted and either side can be switched to fail.
pub struct MockGateway {
    dims: usize,
    answer: String,
    embed_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    fail_embed: AtomicBool,
    fail_complete: AtomicBool,
    last_prompt: Mutex<Option<Prompt>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::with_answer("LangSmith records every step of a run as a trace.")
    }

    pub fn with_answer(answer: &str) -> Self {
        Self {
            dims: TEST_DIMS,
            answer: answer.to_string(),
            embed_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            fail_embed: AtomicBool::new(false),
            fail_complete: AtomicBool::new(false),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn fail_embed(&self, fail: bool) {
        self.fail_embed.store(fail, Ordering::SeqCst);
    }

    pub fn fail_complete(&self, fail: bool) {
        self.fail_complete.store(fail, Ordering::SeqCst);
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().unwrap().clone()
    }

    /// The vector this gateway returns for `text`
    pub fn vector_for(&self, text: &str) -> Embedding {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            let bucket = word
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619))
                as usize
                % (self.dims - 1);
            v[bucket] += 1.0;
        }
        // Keeps every vector non-zero
        v[self.dims - 1] = 0.01;
        v
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed.load(Ordering::SeqCst) {
            return Err(AppError::gateway(Some(500), "mock embedding failure"));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn complete(&self, prompt: &Prompt, _settings: &ModelSettings) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(AppError::gateway(Some(503), "mock completion failure"));
        }
        Ok(self.answer.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn embedding_dimensions(&self) -> usize {
        self.dims
    }
}

/// Fetcher serving fixed documents; unknown URLs fail.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Document> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(text) => Ok(Document::new(url, text.as_str())),
            None => Err(AppError::InvalidInput(format!(
                "Fetching {} returned status 404 Not Found",
                url
            ))),
        }
    }
}

/// Config sized for the mocks, persisting under `index_dir`
pub fn test_config(index_dir: &Path) -> DocQaConfig {
    let mut config = DocQaConfig::default();
    config.models.embedding_dimensions = TEST_DIMS;
    config.chunking.chunk_size = 80;
    config.chunking.chunk_overlap = 10;
    config.chunking.boundary_lookback = 40;
    config.ingestion.embed_batch_size = 2;
    config.ingestion.index_dir = index_dir.to_path_buf();
    config.ingestion.urls = vec![
        "https://docs.example.com/tracing".to_string(),
        "https://docs.example.com/evaluation".to_string(),
    ];
    config
}

/// An index holding one chunk per text, embedded with `gateway`
pub fn index_of(gateway: &MockGateway, texts: &[&str]) -> VectorIndex {
    let entries = texts.iter().enumerate().map(|(i, text)| {
        let chunk = Chunk {
            source: "https://docs.example.com/page".to_string(),
            index: i,
            start: 0,
            end: text.chars().count(),
            text: text.to_string(),
        };
        chunk_entry(&chunk, gateway.vector_for(text))
    });
    VectorIndex::build(gateway.embedding_dimensions(), entries).unwrap()
}

pub const TRACING_PAGE: &str = "LangSmith tracing captures every step of an LLM application.\n\n\
Each run records its inputs, outputs, latency, and token usage so you can debug chains.\n\n\
Traces can be filtered by tag or metadata in the project view.";

pub const EVALUATION_PAGE: &str = "Evaluation in LangSmith compares outputs against a dataset.\n\n\
Evaluators score each example and results are grouped into experiments for comparison.";
