//! Generation backend abstraction
//!
//! Every backend exposes a single `complete(prompt) -> text` call. Failures
//! are reported as a [`BackendError`] tagged with the backend that produced
//! it; they never become an [`AppError`](crate::types::AppError).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The generation backends, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local inference through an Ollama server
    Ollama,
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI (or compatible) Chat Completions API
    OpenAI,
}

impl BackendKind {
    /// Tag used when rendering an inline error, e.g. `[ERROR CLAUDE]`.
    pub fn tag(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "OLLAMA",
            BackendKind::Anthropic => "CLAUDE",
            BackendKind::OpenAI => "OPENAI",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::Anthropic => "anthropic",
            BackendKind::OpenAI => "openai",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure while invoking a generation backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("[ERROR {}] {cause}", backend.tag())]
pub struct BackendError {
    pub backend: BackendKind,
    pub cause: String,
}

impl BackendError {
    pub fn new(backend: BackendKind, cause: impl Into<String>) -> Self {
        Self {
            backend,
            cause: cause.into(),
        }
    }
}

/// Tagged outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub backend: BackendKind,
    pub outcome: Result<String, BackendError>,
}

impl Generation {
    pub fn success(backend: BackendKind, text: impl Into<String>) -> Self {
        Self {
            backend,
            outcome: Ok(text.into()),
        }
    }

    pub fn failure(error: BackendError) -> Self {
        Self {
            backend: error.backend,
            outcome: Err(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    /// The answer text, or the error rendered inline as `[ERROR <TAG>] <cause>`.
    pub fn render(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(err) => err.to_string(),
        }
    }
}

/// A text-generation service.
///
/// Implementations must not panic on transport or decoding problems; they
/// return a [`BackendError`] instead.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Complete a single prompt, returning the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;

    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// The model identifier requests are sent to.
    fn model_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_renders_with_tag() {
        let err = BackendError::new(BackendKind::Anthropic, "rate limited");
        assert_eq!(err.to_string(), "[ERROR CLAUDE] rate limited");

        let err = BackendError::new(BackendKind::Ollama, "connection refused");
        assert_eq!(err.to_string(), "[ERROR OLLAMA] connection refused");
    }

    #[test]
    fn test_generation_render() {
        let ok = Generation::success(BackendKind::OpenAI, "- 5 years");
        assert!(!ok.is_failure());
        assert_eq!(ok.render(), "- 5 years");

        let failed = Generation::failure(BackendError::new(BackendKind::OpenAI, "timeout"));
        assert!(failed.is_failure());
        assert_eq!(failed.backend, BackendKind::OpenAI);
        assert_eq!(failed.render(), "[ERROR OPENAI] timeout");
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BackendKind::OpenAI).unwrap(),
            "\"openai\""
        );
        assert_eq!(BackendKind::Anthropic.to_string(), "anthropic");
    }
}
