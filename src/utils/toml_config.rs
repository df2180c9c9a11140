//! TOML-based configuration for docqa
//!
//! Gateway endpoint, model identifiers, chunking, retrieval, and ingestion
//! sources are all declared in `docqa.toml`. Every field has a default, so a
//! missing file yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Root configuration structure loaded from docqa.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocQaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============= Gateway Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Environment variable name containing the gateway API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Header that carries the API key on every request
    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "https://gateway.salesforceresearch.ai/openai/process/v1".to_string()
}

fn default_api_key_env() -> String {
    "X_API_KEY".to_string()
}

fn default_auth_header() -> String {
    "X-Api-Key".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            api_key_env: default_api_key_env(),
            auth_header: default_auth_header(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding: String,

    /// Output dimension of the embedding model; checked on every embed call
    /// and against the persisted index at load time
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    #[serde(default = "default_completion_model")]
    pub completion: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            completion: default_completion_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

// ============= Chunking Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// How many characters before the hard limit to search for a boundary
    #[serde(default = "default_boundary_lookback")]
    pub boundary_lookback: usize,
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_boundary_lookback() -> usize {
    128
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            boundary_lookback: default_boundary_lookback(),
        }
    }
}

// ============= Retrieval Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

// ============= Ingestion Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Source URLs, fetched in order
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,

    /// Maximum number of chunks per embedding request
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

fn default_urls() -> Vec<String> {
    [
        "https://docs.langchain.com/langsmith/home",
        "https://docs.langchain.com/langsmith/observability-quickstart",
        "https://docs.langchain.com/langsmith/evaluation-quickstart",
        "https://docs.langchain.com/langsmith/prompt-engineering-quickstart",
        "https://docs.langchain.com/langsmith/quick-start-studio",
        "https://docs.langchain.com/langsmith/observability",
        "https://docs.langchain.com/langsmith/evaluation",
        "https://docs.langchain.com/langsmith/prompt-engineering",
        "https://docs.langchain.com/langsmith/deployments",
        "https://docs.langchain.com/langsmith/platform-setup",
        "https://docs.langchain.com/langsmith/create-account-api-key",
        "https://docs.langchain.com/langsmith/datasets",
        "https://docs.langchain.com/langsmith/monitoring",
        "https://docs.langchain.com/langsmith/testing",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_embed_batch_size() -> usize {
    64
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("data/docqa_index")
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            urls: default_urls(),
            embed_batch_size: default_embed_batch_size(),
            index_dir: default_index_dir(),
        }
    }
}

// ============= Pipeline Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How many batch questions run at once
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_batch_concurrency() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

impl DocQaConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::FileNotFound(p)) => {
                info!(path = ?p, "Config file not found, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DocQaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }

        if self.retrieval.k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.k must be greater than zero".to_string(),
            ));
        }

        if self.ingestion.embed_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingestion.embed_batch_size must be greater than zero".to_string(),
            ));
        }

        if self.pipeline.batch_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.batch_concurrency must be greater than zero".to_string(),
            ));
        }

        if self.models.embedding_dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "models.embedding_dimensions must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.models.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "models.temperature ({}) must be within 0.0..=2.0",
                self.models.temperature
            )));
        }

        let url = &self.gateway.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "gateway.base_url must be an http(s) URL, got '{}'",
                url
            )));
        }

        if self.gateway.auth_header.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.auth_header must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve an environment variable
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get the gateway API key from the environment
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.gateway.api_key_env)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(self.gateway.api_key_env.clone()))
    }
}
