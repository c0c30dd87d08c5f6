//! Configuration-driven backend selection.
//!
//! The dispatcher holds an ordered list of [`BackendDescriptor`]s. For each
//! call it walks the list once and uses the first descriptor whose predicate
//! accepts the configuration. That backend's result, success or failure, is
//! the result of the call: a failed backend is never retried and never
//! escalated to the next descriptor.

use crate::llm::client::{BackendError, BackendKind, Generation, GenerationBackend};
use crate::utils::config::GenerationConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

type Predicate = Box<dyn Fn(&GenerationConfig) -> bool + Send + Sync>;
type Connect =
    Box<dyn Fn(&GenerationConfig) -> Result<Arc<dyn GenerationBackend>, BackendError> + Send + Sync>;

/// One entry of the selection chain.
pub struct BackendDescriptor {
    kind: BackendKind,
    predicate: Predicate,
    connect: Connect,
}

impl BackendDescriptor {
    pub fn new<P, C>(kind: BackendKind, predicate: P, connect: C) -> Self
    where
        P: Fn(&GenerationConfig) -> bool + Send + Sync + 'static,
        C: Fn(&GenerationConfig) -> Result<Arc<dyn GenerationBackend>, BackendError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            kind,
            predicate: Box::new(predicate),
            connect: Box::new(connect),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn accepts(&self, config: &GenerationConfig) -> bool {
        (self.predicate)(config)
    }
}

impl std::fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub struct GenerationDispatcher {
    config: GenerationConfig,
    descriptors: Vec<BackendDescriptor>,
}

impl GenerationDispatcher {
    pub fn new(config: GenerationConfig, descriptors: Vec<BackendDescriptor>) -> Self {
        Self {
            config,
            descriptors,
        }
    }

    /// The standard chain: local Ollama, then Anthropic, then OpenAI as the default.
    ///
    /// `language` is woven into the OpenAI system instruction.
    pub fn standard(config: GenerationConfig, language: &str) -> Self {
        let language = language.to_string();

        let descriptors = vec![
            BackendDescriptor::new(
                BackendKind::Ollama,
                GenerationConfig::local_selected,
                connect_ollama,
            ),
            BackendDescriptor::new(
                BackendKind::Anthropic,
                GenerationConfig::anthropic_selected,
                connect_anthropic,
            ),
            BackendDescriptor::new(
                BackendKind::OpenAI,
                |_| true,
                move |config| connect_openai(config, &language),
            ),
        ];

        Self::new(config, descriptors)
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// The descriptor this configuration selects, if any.
    pub fn selected(&self) -> Option<&BackendDescriptor> {
        self.descriptors.iter().find(|d| d.accepts(&self.config))
    }

    pub fn selected_kind(&self) -> Option<BackendKind> {
        self.selected().map(BackendDescriptor::kind)
    }

    /// Generate text for `prompt` with the selected backend.
    ///
    /// Never fails: every problem is captured in the returned [`Generation`].
    #[instrument(skip_all, fields(backend = tracing::field::Empty))]
    pub async fn generate(&self, prompt: &str) -> Generation {
        let Some(descriptor) = self.selected() else {
            warn!("No generation backend accepted the configuration");
            return Generation::failure(BackendError::new(
                BackendKind::OpenAI,
                "no generation backend is configured",
            ));
        };

        let kind = descriptor.kind();
        tracing::Span::current().record("backend", kind.name());

        let backend = match (descriptor.connect)(&self.config) {
            Ok(backend) => backend,
            Err(err) => {
                warn!(error = %err, "Failed to set up generation backend");
                return Generation::failure(err);
            }
        };

        info!(model = %backend.model_name(), prompt_chars = prompt.len(), "Dispatching prompt");

        match backend.complete(prompt).await {
            Ok(text) => Generation::success(kind, text),
            Err(err) => {
                warn!(error = %err, "Generation backend failed");
                Generation::failure(err)
            }
        }
    }

    /// Like [`generate`](Self::generate) but renders failures inline.
    pub async fn generate_text(&self, prompt: &str) -> String {
        self.generate(prompt).await.render()
    }
}

#[cfg(any(
    not(feature = "ollama"),
    not(feature = "anthropic"),
    not(feature = "openai")
))]
fn not_compiled(kind: BackendKind, feature: &str) -> BackendError {
    BackendError::new(
        kind,
        format!("support for this backend was not compiled in (enable the `{}` feature)", feature),
    )
}

fn connect_ollama(config: &GenerationConfig) -> Result<Arc<dyn GenerationBackend>, BackendError> {
    #[cfg(feature = "ollama")]
    {
        Ok(Arc::new(crate::llm::ollama::OllamaBackend::new(&config.ollama)?))
    }
    #[cfg(not(feature = "ollama"))]
    {
        let _ = config;
        Err(not_compiled(BackendKind::Ollama, "ollama"))
    }
}

fn connect_anthropic(
    config: &GenerationConfig,
) -> Result<Arc<dyn GenerationBackend>, BackendError> {
    #[cfg(feature = "anthropic")]
    {
        Ok(Arc::new(crate::llm::anthropic::AnthropicBackend::new(
            &config.anthropic,
        )?))
    }
    #[cfg(not(feature = "anthropic"))]
    {
        let _ = config;
        Err(not_compiled(BackendKind::Anthropic, "anthropic"))
    }
}

fn connect_openai(
    config: &GenerationConfig,
    language: &str,
) -> Result<Arc<dyn GenerationBackend>, BackendError> {
    #[cfg(feature = "openai")]
    {
        Ok(Arc::new(crate::llm::openai::OpenAIBackend::new(
            &config.openai,
            language,
        )?))
    }
    #[cfg(not(feature = "openai"))]
    {
        let _ = (config, language);
        Err(not_compiled(BackendKind::OpenAI, "openai"))
    }
}
