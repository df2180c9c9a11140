use crate::llm::client::{GatewayClient, ModelSettings, Prompt};
use crate::types::{AppError, Embedding, Result};
use crate::utils::toml_config::DocQaConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Gateway client speaking OpenAI-shaped JSON over reqwest
///
/// The API key travels in a configurable header (`X-Api-Key` by default)
/// instead of `Authorization: Bearer`.
#[derive(Clone)]
pub struct HttpGatewayClient {
    client: Client,
    base_url: String,
    embedding_model: String,
    embedding_dimensions: usize,
}

impl HttpGatewayClient {
    pub fn new(
        base_url: &str,
        auth_header: &str,
        api_key: &str,
        timeout: Duration,
        embedding_model: impl Into<String>,
        embedding_dimensions: usize,
    ) -> Result<Self> {
        let header_name = HeaderName::from_bytes(auth_header.trim().as_bytes()).map_err(|e| {
            AppError::Configuration(format!("Invalid auth header name '{}': {}", auth_header, e))
        })?;
        let mut key = HeaderValue::from_str(api_key.trim())
            .map_err(|e| AppError::Configuration(format!("Invalid gateway API key: {}", e)))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header_name, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model: embedding_model.into(),
            embedding_dimensions,
        })
    }

    /// Build from configuration, reading the API key from the environment
    pub fn from_config(config: &DocQaConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::new(
            &config.gateway.base_url,
            &config.gateway.auth_header,
            &api_key,
            Duration::from_secs(config.gateway.timeout_secs),
            config.models.embedding.clone(),
            config.models.embedding_dimensions,
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::gateway(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            warn!(path, status = status.as_u16(), "Gateway request failed");
            return Err(AppError::gateway(Some(status.as_u16()), body));
        }

        response.json::<R>().await.map_err(|e| {
            AppError::gateway(
                Some(status.as_u16()),
                format!("Failed to parse gateway response: {}", e),
            )
        })
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.embedding_model))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(AppError::InvalidInput(
                "embed requires at least one input text".to_string(),
            ));
        }

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let mut parsed: EmbeddingResponse = self.post_json("embeddings", &request).await?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(AppError::gateway(
                None,
                format!(
                    "Gateway returned {} embeddings for {} inputs",
                    parsed.data.len(),
                    texts.len()
                ),
            ));
        }

        if let Some((position, entry)) = parsed
            .data
            .iter()
            .enumerate()
            .find(|(position, entry)| entry.index != *position)
        {
            return Err(AppError::gateway(
                None,
                format!(
                    "Gateway returned embedding index {} where {} was expected",
                    entry.index, position
                ),
            ));
        }

        let vectors: Vec<Embedding> = parsed.data.into_iter().map(|e| e.embedding).collect();
        if let Some(bad) = vectors
            .iter()
            .find(|v| v.len() != self.embedding_dimensions)
        {
            return Err(AppError::gateway(
                None,
                format!(
                    "Embedding model '{}' returned dimension {}, configured {}",
                    self.embedding_model,
                    bad.len(),
                    self.embedding_dimensions
                ),
            ));
        }

        debug!(count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }

    #[instrument(skip(self, prompt), fields(model = %settings.model))]
    async fn complete(&self, prompt: &Prompt, settings: &ModelSettings) -> Result<String> {
        let request = ChatRequest {
            model: &settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };
        let parsed: ChatResponse = self.post_json("chat/completions", &request).await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::gateway(None, "Gateway returned no completion choices"))?;

        debug!(chars = content.len(), "Completion received");
        Ok(content)
    }

    async fn ping(&self) -> Result<()> {
        // Any HTTP answer, even 404, proves the gateway is reachable
        self.client
            .get(self.endpoint("models"))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| AppError::gateway(None, e.to_string()))
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }
}

// ============= Wire Types =============

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_header_name() {
        let result = HttpGatewayClient::new(
            "http://localhost",
            "bad header",
            "key",
            Duration::from_secs(1),
            "m",
            4,
        );
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = HttpGatewayClient::new(
            "http://localhost:4010/v1/",
            "X-Api-Key",
            "key",
            Duration::from_secs(1),
            "m",
            4,
        )
        .unwrap();
        assert_eq!(client.endpoint("embeddings"), "http://localhost:4010/v1/embeddings");
    }

    #[tokio::test]
    async fn test_embed_rejects_empty_input() {
        let client = HttpGatewayClient::new(
            "http://localhost:1",
            "X-Api-Key",
            "key",
            Duration::from_secs(1),
            "m",
            4,
        )
        .unwrap();
        let err = client.embed(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
