//! OpenAI (and compatible endpoint) generation backend.

use crate::llm::client::{BackendError, BackendKind, GenerationBackend};
use crate::utils::config::OpenAIConfig as OpenAISettings;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

/// Fixed sampling temperature for this backend.
pub const OPENAI_TEMPERATURE: f32 = 0.3;

/// The system instruction sent ahead of every prompt.
pub fn system_instruction(language: &str) -> String {
    format!(
        "You are a concise and precise assistant. Answer in {} and cite the provided sources when relevant.",
        language
    )
}

pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    model: String,
    system: String,
}

impl OpenAIBackend {
    /// Build a client, reading `OPENAI_API_KEY` from the process environment
    /// unless the settings carry an explicit key.
    pub fn new(settings: &OpenAISettings, language: &str) -> Result<Self, BackendError> {
        Self::with_key_lookup(settings, language, |name| std::env::var(name).ok())
    }

    pub fn with_key_lookup<F>(
        settings: &OpenAISettings,
        language: &str,
        lookup: F,
    ) -> Result<Self, BackendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| fail("OPENAI_API_KEY is not set"))?;

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(settings.api_base.clone());

        Ok(Self {
            client: Client::with_config(config),
            model: settings.model.clone(),
            system: system_instruction(language),
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                    self.system.clone(),
                )),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                    prompt.to_string(),
                )),
            ])
            .temperature(OPENAI_TEMPERATURE)
            .build()
            .map_err(|e| fail(format!("failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| fail(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| fail("response contained no message content"))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::OpenAI
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

fn fail(cause: impl Into<String>) -> BackendError {
    BackendError::new(BackendKind::OpenAI, cause)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_backend_failure() {
        for value in [None, Some("")] {
            let err = OpenAIBackend::with_key_lookup(&OpenAISettings::default(), "English", |_| {
                value.map(str::to_string)
            })
            .err()
            .unwrap();
            assert_eq!(err.to_string(), "[ERROR OPENAI] OPENAI_API_KEY is not set");
        }
    }

    #[test]
    fn test_key_is_looked_up_on_each_construction() {
        let key = std::sync::Mutex::new(None::<String>);
        let lookup = |name: &str| {
            assert_eq!(name, "OPENAI_API_KEY");
            key.lock().unwrap().clone()
        };
        let settings = OpenAISettings::default();

        assert!(OpenAIBackend::with_key_lookup(&settings, "English", lookup).is_err());

        *key.lock().unwrap() = Some("sk-rotated".to_string());
        let backend = OpenAIBackend::with_key_lookup(&settings, "English", lookup).unwrap();
        assert_eq!(backend.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_explicit_key_skips_lookup() {
        let settings = OpenAISettings {
            api_key: Some("sk-explicit".to_string()),
            ..Default::default()
        };
        let backend = OpenAIBackend::with_key_lookup(&settings, "English", |_| {
            panic!("environment should not be consulted")
        });
        assert!(backend.is_ok());
    }

    #[test]
    fn test_system_instruction_mentions_language() {
        let instruction = system_instruction("Spanish");
        assert!(instruction.contains("Answer in Spanish"));
        assert!(instruction.contains("cite"));
    }
}
