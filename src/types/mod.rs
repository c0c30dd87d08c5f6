use serde::{Deserialize, Serialize};

// ============= Fragment Types =============

/// A persisted chunk of source text with its provenance.
///
/// Any extra keys written at ingestion time are kept in `extra` and
/// serialized back alongside `text` and `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub source: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A fragment returned by retrieval, with its index score and 0-based rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFragment {
    #[serde(flatten)]
    pub fragment: Fragment,
    pub score: f32,
    pub rank: usize,
}

impl ScoredFragment {
    pub fn text(&self) -> &str {
        &self.fragment.text
    }

    pub fn source(&self) -> &str {
        &self.fragment.source
    }
}

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub backend: String,
    pub failed: bool,
    pub contexts: Vec<ScoredFragment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub index_ready: bool,
    pub backend: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Index or metadata artifact is missing; the offline ingestion step never ran.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The embedding model is not present in the local cache.
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Artifacts exist but are unreadable or disagree with each other.
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Structural failures are missing or broken offline artifacts, not transient faults.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            AppError::IndexNotFound(_) | AppError::ModelUnavailable(_) | AppError::InvalidIndex(_)
        )
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::IndexNotFound(_)
            | AppError::ModelUnavailable(_)
            | AppError::InvalidIndex(_) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::Embedding(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<cvrag_index::Error> for AppError {
    fn from(err: cvrag_index::Error) -> Self {
        AppError::InvalidIndex(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
