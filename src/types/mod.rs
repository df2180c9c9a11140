use serde::{Deserialize, Serialize};

use crate::workflows::{PipelineState, StageEvent};

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub output: PipelineState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
}

/// One batch result: either the finished state or an error marker.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Ok { output: PipelineState },
    Err { error: String, kind: String },
}

impl From<Result<PipelineState>> for BatchItem {
    fn from(result: Result<PipelineState>) -> Self {
        match result {
            Ok(output) => BatchItem::Ok { output },
            Err(e) => BatchItem::Err {
                kind: e.kind().to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// Payload of one `stage` server-sent event.
#[derive(Debug, Serialize, Deserialize)]
pub struct StageEventPayload {
    pub stage: String,
    pub field: String,
    pub value: String,
}

impl From<&StageEvent> for StageEventPayload {
    fn from(event: &StageEvent) -> Self {
        Self {
            stage: event.stage.name().to_string(),
            field: event.field.name().to_string(),
            value: event.value.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub index_loaded: bool,
    pub index_entries: usize,
    pub gateway_reachable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexStatusResponse {
    pub status: String,
    pub entries: usize,
    pub dimensions: usize,
}

// ============= Document Types =============

/// Raw text fetched from one source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A contiguous slice of a [`Document`], addressed in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    /// Position of this chunk within its document.
    pub index: usize,
    /// Character offset of the first character (inclusive).
    pub start: usize,
    /// Character offset past the last character (exclusive).
    pub end: usize,
    pub text: String,
}

impl Chunk {
    /// Stable id of the chunk inside an index.
    pub fn id(&self) -> String {
        format!("{}#{}", self.source, self.index)
    }

    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

pub type Embedding = Vec<f32>;

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Gateway error{}: {message}", status_suffix(.status))]
    Gateway {
        status: Option<u16>,
        message: String,
    },

    #[error("No persisted index found at {0}")]
    IndexNotFound(String),

    #[error("Persisted index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("No index is loaded; run ingestion first")]
    IndexNotLoaded,

    #[error("No documents could be loaded from {attempted} source URL(s)")]
    NoDocumentsLoaded { attempted: usize },

    #[error("Another ingestion is already running")]
    IngestionInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("State field '{0}' was already written")]
    FieldAlreadySet(&'static str),

    #[error("State field '{0}' is required but unset")]
    MissingField(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn gateway(status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Gateway {
            status,
            message: message.into(),
        }
    }

    /// Only gateway failures are worth retrying without operator action.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AppError::Gateway { .. })
    }

    /// Machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Gateway { .. } => "gateway_error",
            AppError::IndexNotFound(_) => "index_not_found",
            AppError::IndexCorrupt(_) => "index_corrupt",
            AppError::IndexNotLoaded => "index_not_loaded",
            AppError::NoDocumentsLoaded { .. } => "no_documents_loaded",
            AppError::IngestionInProgress => "ingestion_in_progress",
            AppError::Configuration(_) => "configuration_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::FieldAlreadySet(_) => "field_already_set",
            AppError::MissingField(_) => "missing_field",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<docqa_vector::Error> for AppError {
    fn from(err: docqa_vector::Error) -> Self {
        use docqa_vector::Error as VectorError;
        match err {
            VectorError::NotFound(path) => AppError::IndexNotFound(path.display().to_string()),
            VectorError::Corrupt(msg) => AppError::IndexCorrupt(msg),
            VectorError::DimensionMismatch { expected, actual } => AppError::IndexCorrupt(format!(
                "embedding dimension mismatch: configured model produces {}, index holds {}",
                expected, actual
            )),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::IndexNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IndexCorrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IndexNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NoDocumentsLoaded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::IngestionInProgress => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_)
            | AppError::FieldAlreadySet(_)
            | AppError::MissingField(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });

        (status, axum::Json(body)).into_response()
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_gateway_error_display_includes_status() {
        let err = AppError::gateway(Some(503), "upstream busy");
        assert_eq!(err.to_string(), "Gateway error (status 503): upstream busy");
        assert!(err.is_retriable());

        let err = AppError::gateway(None, "connection refused");
        assert_eq!(err.to_string(), "Gateway error: connection refused");
    }

    #[test]
    fn test_vector_errors_map_to_index_errors() {
        let err: AppError = docqa_vector::Error::NotFound(PathBuf::from("data/idx")).into();
        assert!(matches!(err, AppError::IndexNotFound(_)));

        let err: AppError = docqa_vector::Error::DimensionMismatch {
            expected: 1536,
            actual: 3,
        }
        .into();
        assert!(matches!(err, AppError::IndexCorrupt(_)));
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_chunk_id() {
        let chunk = Chunk {
            source: "https://docs.example.com/a".to_string(),
            index: 2,
            start: 10,
            end: 25,
            text: "x".repeat(15),
        };
        assert_eq!(chunk.id(), "https://docs.example.com/a#2");
        assert_eq!(chunk.char_len(), 15);
    }
}
