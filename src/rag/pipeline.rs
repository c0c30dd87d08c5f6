use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::llm::{BackendKind, GenerationDispatcher};
use crate::rag::embeddings::LazyEmbedder;
use crate::rag::prompt::PromptBuilder;
use crate::rag::retriever::Retriever;
use crate::types::{AppError, AskResponse, Result, ScoredFragment};
use crate::utils::config::{RagConfig, MAX_TOP_K};

/// What one question produces: the answer and the contexts behind it.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    /// Generated text, or the inline `[ERROR <TAG>] ...` message
    pub answer: String,
    pub backend: BackendKind,
    /// True when `answer` is a rendered backend failure
    pub failed: bool,
    pub contexts: Vec<ScoredFragment>,
}

impl From<RagAnswer> for AskResponse {
    fn from(answer: RagAnswer) -> Self {
        AskResponse {
            answer: answer.answer,
            backend: answer.backend.name().to_string(),
            failed: answer.failed,
            contexts: answer.contexts,
        }
    }
}

/// Retrieval, prompt construction and generation, in that order.
///
/// This is the entry point the CLI and HTTP layers use.
pub struct RagPipeline {
    retriever: Retriever,
    prompts: PromptBuilder,
    dispatcher: GenerationDispatcher,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, prompts: PromptBuilder, dispatcher: GenerationDispatcher) -> Self {
        Self {
            retriever,
            prompts,
            dispatcher,
        }
    }

    /// Wire the standard components from configuration.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let embedder = Arc::new(LazyEmbedder::from_config(&config.embedding)?);
        Ok(Self::new(
            Retriever::from_config(&config.retrieval, embedder),
            PromptBuilder::from_config(&config.prompt),
            GenerationDispatcher::standard(config.generation.clone(), &config.prompt.language),
        ))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn dispatcher(&self) -> &GenerationDispatcher {
        &self.dispatcher
    }

    /// Answer `query` using the configured number of contexts.
    pub async fn answer(&self, query: &str) -> Result<RagAnswer> {
        self.answer_with(query, self.retriever.top_k()).await
    }

    /// Answer `query` retrieving at most `top_k` contexts.
    ///
    /// Missing or broken artifacts abort the call. Generation problems do
    /// not: they come back as a failed [`RagAnswer`] that still carries the
    /// retrieved contexts.
    #[instrument(skip(self, query), fields(query_id = %Uuid::new_v4()))]
    pub async fn answer_with(&self, query: &str, top_k: usize) -> Result<RagAnswer> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput("query must not be empty".to_string()));
        }
        if top_k == 0 || top_k > MAX_TOP_K {
            return Err(AppError::InvalidInput(format!(
                "top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }

        let contexts = match self.retriever.retrieve_k(query, top_k).await {
            Ok(contexts) => contexts,
            Err(err) => {
                if err.is_structural() {
                    error!(error = %err, "Retrieval precondition failed");
                }
                return Err(err);
            }
        };

        let prompt = self.prompts.build(query, &contexts);
        let generation = self.dispatcher.generate(&prompt).await;

        if generation.is_failure() {
            warn!(backend = %generation.backend, "Answer is a rendered backend error");
        } else {
            info!(backend = %generation.backend, contexts = contexts.len(), "Answered query");
        }

        Ok(RagAnswer {
            answer: generation.render(),
            backend: generation.backend,
            failed: generation.is_failure(),
            contexts,
        })
    }
}
