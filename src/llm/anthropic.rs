//! Anthropic Claude generation backend
//!
//! Enable with the `anthropic` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use cvrag::llm::{AnthropicBackend, GenerationBackend};
//!
//! let backend = AnthropicBackend::new(&config.generation.anthropic)?;
//! let text = backend.complete("Summarise this CV").await?;
//! ```

use crate::llm::client::{BackendError, BackendKind, GenerationBackend};
use crate::utils::config::AnthropicConfig;
use async_trait::async_trait;
use claude_sdk::{ClaudeClient, ContentBlock, Message, MessagesRequest};

/// Claude client sending the prompt as a single user message
pub struct AnthropicBackend {
    client: ClaudeClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicBackend {
    pub fn new(config: &AnthropicConfig) -> Result<Self, BackendError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| BackendError::new(BackendKind::Anthropic, "ANTHROPIC_API_KEY is not set"))?;

        Ok(Self {
            client: ClaudeClient::anthropic(api_key),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Concatenate every text block of a response, in order
    fn extract_text_content(content: &[ContentBlock]) -> String {
        content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    fn build_request(&self, prompt: &str) -> MessagesRequest {
        MessagesRequest::new(
            self.model.clone(),
            self.max_tokens,
            vec![Message::user(prompt.to_string())],
        )
        .with_temperature(self.temperature)
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .send_message(self.build_request(prompt))
            .await
            .map_err(|e| BackendError::new(BackendKind::Anthropic, e.to_string()))?;

        Ok(Self::extract_text_content(&response.content).trim().to_string())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
