//! # cvrag - grounded question answering over a CV
//!
//! Answers questions about a fixed document collection by retrieving the
//! most similar fragments from a prebuilt vector index and asking a language
//! model to answer from those fragments only, citing them.
//!
//! ## Overview
//!
//! cvrag can be used in two ways:
//!
//! 1. **As a binary** - `cvrag ask`, `cvrag check` and `cvrag serve`
//! 2. **As a library** - build a [`RagPipeline`] and call [`RagPipeline::answer`]
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use cvrag::{RagConfig, RagPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RagConfig::load("cvrag.toml", false)?;
//!     let pipeline = RagPipeline::from_config(&config)?;
//!
//!     let answer = pipeline.answer("How many years of experience?").await?;
//!     println!("{}", answer.answer);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Local generation through Ollama (default) |
//! | `anthropic` | Anthropic Claude (default) |
//! | `openai` | OpenAI and compatible APIs (default) |
//! | `local-embeddings` | fastembed ONNX query embedding |
//!
//! ## Modules
//!
//! - [`api`] - HTTP handlers and routes
//! - [`llm`] - Generation backends and the dispatcher
//! - [`rag`] - Embedding, retrieval, prompting and the pipeline
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and logging

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line parsing and terminal output.
pub mod cli;
/// Generation backends and selection.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (fragments, responses, errors).
pub mod types;
/// Configuration and logging.
pub mod utils;

// Re-export commonly used types
pub use llm::{BackendError, BackendKind, Generation, GenerationBackend, GenerationDispatcher};
pub use rag::{RagAnswer, RagPipeline, Retriever};
pub use types::{AppError, Result};
pub use utils::config::RagConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The question answering pipeline
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
