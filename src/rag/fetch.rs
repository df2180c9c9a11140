use crate::types::{AppError, Document, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument};

/// Loads the raw text behind a source URL
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document>;
}

/// Fetches pages over HTTP and reduces HTML to its visible text
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docqa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Document> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::InvalidInput(format!(
                "Fetching {} returned status {}",
                url, status
            )));
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("html"))
            .unwrap_or(false);
        let body = response
            .text()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read {}: {}", url, e)))?;

        let text = if is_html || body.trim_start().starts_with('<') {
            html_to_text(&body)?
        } else {
            normalize_lines(&body)
        };

        if text.is_empty() {
            return Err(AppError::InvalidInput(format!("{} has no text content", url)));
        }

        debug!(chars = text.chars().count(), "Fetched document");
        Ok(Document::new(url, text))
    }
}

/// Visible text of an HTML page, one trimmed line per text line
pub fn html_to_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .map_err(|e| AppError::Internal(format!("Invalid selector: {:?}", e)))?;

    let mut raw = String::new();
    let root = document
        .select(&body)
        .next()
        .unwrap_or_else(|| document.root_element());

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
                .unwrap_or(false)
        });
        if !hidden {
            raw.push_str(text);
        }
    }

    Ok(normalize_lines(&raw))
}

/// Trim and squeeze each line; runs of blank lines become one
fn normalize_lines(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in raw.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_drops_scripts_and_keeps_paragraphs() {
        let html = r#"<html><head><title>T</title><style>p { color: red; }</style></head>
            <body>
              <h1>Tracing</h1>
              <script>var x = 1;</script>
              <p>LangSmith   records
              every run.</p>

              <p>Second <b>paragraph</b>.</p>
            </body></html>"#;

        let text = html_to_text(html).unwrap();
        assert_eq!(
            text,
            "Tracing\n\nLangSmith records\nevery run.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_normalize_plain_text() {
        assert_eq!(normalize_lines("  a  b \n\n\n c "), "a b\n\nc");
        assert_eq!(normalize_lines("   \n\t"), "");
    }
}
