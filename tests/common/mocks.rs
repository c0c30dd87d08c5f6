//! Mock implementations for testing.
//!
//! A deterministic embedder and a recording generation backend, so the
//! pipeline can be exercised end to end without model files or network.

use async_trait::async_trait;
use cvrag::llm::{BackendError, BackendKind, GenerationBackend};
use cvrag::rag::Embedder;
use cvrag::types::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Words the test embedder knows about, one dimension each.
pub const VOCABULARY: [&str; 6] = ["years", "experience", "backend", "systems", "graduated", "2019"];

/// Bag-of-words vector over [`VOCABULARY`], L2-normalized.
pub fn vocabulary_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; VOCABULARY.len()];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if let Some(i) = VOCABULARY.iter().position(|v| *v == word) {
            vector[i] += 1.0;
        }
    }
    cvrag_index::normalize(&mut vector);
    vector
}

/// Embedder backed by [`vocabulary_vector`] that counts its calls.
#[derive(Clone, Default)]
pub struct VocabularyEmbedder {
    pub calls: Arc<AtomicUsize>,
}

impl VocabularyEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for VocabularyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| vocabulary_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Generation backend with a canned reply that records every prompt.
///
/// # Examples
///
/// ```ignore
/// let backend = RecordingBackend::new(BackendKind::OpenAI, "- 5 years [1]");
/// let backend = RecordingBackend::failing(BackendKind::Ollama, "connection refused");
/// ```
#[derive(Clone)]
pub struct RecordingBackend {
    kind: BackendKind,
    reply: std::result::Result<String, String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingBackend {
    pub fn new(kind: BackendKind, reply: &str) -> Self {
        Self {
            kind,
            reply: Ok(reply.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing(kind: BackendKind, cause: &str) -> Self {
        Self {
            kind,
            reply: Err(cause.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationBackend for RecordingBackend {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .map_err(|cause| BackendError::new(self.kind, cause))
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn model_name(&self) -> String {
        "recording".to_string()
    }
}
