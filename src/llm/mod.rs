//! Generation backends and the dispatcher that picks between them
//!
//! Three interchangeable backends sit behind the [`GenerationBackend`] trait:
//!
//! - `ollama` - a local Ollama server
//! - `anthropic` - the Anthropic Messages API
//! - `openai` - OpenAI or any compatible Chat Completions endpoint
//!
//! Each is behind a Cargo feature of the same name. Selection happens in
//! [`GenerationDispatcher`] and depends only on configuration: a local model
//! name wins, then an Anthropic key, otherwise OpenAI.
//!
//! # Example
//!
//! ```ignore
//! use cvrag::llm::GenerationDispatcher;
//!
//! let dispatcher = GenerationDispatcher::standard(config.generation.clone(), "English");
//! let generation = dispatcher.generate(&prompt).await;
//! println!("{}", generation.render());
//! ```

/// Backend trait, kinds and the tagged generation result.
pub mod client;
/// Ordered backend selection.
pub mod dispatcher;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub mod anthropic;

pub use client::{BackendError, BackendKind, Generation, GenerationBackend};
pub use dispatcher::{BackendDescriptor, GenerationDispatcher};

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicBackend;
#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
#[cfg(feature = "openai")]
pub use openai::OpenAIBackend;
