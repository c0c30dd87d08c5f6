//! Local generation through an Ollama server.
//!
//! Enable with the `ollama` feature flag. The request is a single
//! non-streaming user message; sampling options come from
//! [`OllamaConfig`] and the timeout is enforced by the HTTP client.

use crate::llm::client::{BackendError, BackendKind, GenerationBackend};
use crate::utils::config::OllamaConfig;
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    generation::parameters::{KeepAlive, TimeUnit},
    models::ModelOptions,
    Ollama,
};
use std::time::Duration;

const DEFAULT_PORT: u16 = 11434;

pub struct OllamaBackend {
    client: Ollama,
    model: String,
    options: ModelOptions,
    keep_alive: String,
}

impl OllamaBackend {
    /// Build a client from configuration. Fails if no model is configured,
    /// the host is not a URL, or the keep-alive value is malformed.
    pub fn new(config: &OllamaConfig) -> Result<Self, BackendError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| fail("no local model configured"))?;

        let (host, port) = split_host(&config.host)?;
        parse_keep_alive(&config.keep_alive)?;

        if !(config.timeout_secs.is_finite() && config.timeout_secs > 0.0) {
            return Err(fail(format!("invalid timeout {}s", config.timeout_secs)));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .build()
            .map_err(|e| fail(format!("failed to build HTTP client: {}", e)))?;

        let options = ModelOptions::default()
            .num_predict(config.num_predict)
            .temperature(config.temperature)
            .num_thread(config.num_thread)
            .num_ctx(config.num_ctx);

        Ok(Self {
            client: Ollama::new_with_client(host, port, http),
            model,
            options,
            keep_alive: config.keep_alive.clone(),
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let request =
            ChatMessageRequest::new(self.model.clone(), vec![ChatMessage::user(prompt.to_string())])
                .options(self.options.clone())
                .keep_alive(parse_keep_alive(&self.keep_alive)?);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| fail(e.to_string()))?;

        Ok(response.message.content.trim().to_string())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

fn fail(cause: impl Into<String>) -> BackendError {
    BackendError::new(BackendKind::Ollama, cause)
}

/// Split `http://host:port` into the `(scheme://host, port)` pair the client wants.
fn split_host(raw: &str) -> Result<(String, u16), BackendError> {
    let url = reqwest::Url::parse(raw)
        .map_err(|e| fail(format!("invalid OLLAMA_HOST '{}': {}", raw, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| fail(format!("OLLAMA_HOST '{}' has no host", raw)))?;

    Ok((
        format!("{}://{}", url.scheme(), host),
        url.port().unwrap_or(DEFAULT_PORT),
    ))
}

/// Parse keep-alive values such as `10m`, `30s`, `2h`, `-1` (forever) and `0` (unload).
fn parse_keep_alive(raw: &str) -> Result<KeepAlive, BackendError> {
    let raw = raw.trim();
    match raw {
        "-1" => return Ok(KeepAlive::Indefinitely),
        "0" => return Ok(KeepAlive::UnloadOnCompletion),
        _ => {}
    }

    let invalid = || fail(format!("invalid OLLAMA_KEEP_ALIVE '{}'", raw));

    let (digits, unit) = match raw.char_indices().last() {
        Some((i, 's')) => (&raw[..i], TimeUnit::Seconds),
        Some((i, 'm')) => (&raw[..i], TimeUnit::Minutes),
        Some((i, 'h')) => (&raw[..i], TimeUnit::Hours),
        Some(_) => (raw, TimeUnit::Seconds),
        None => return Err(invalid()),
    };

    let time: u64 = digits.parse().map_err(|_| invalid())?;
    if time == 0 {
        return Ok(KeepAlive::UnloadOnCompletion);
    }
    Ok(KeepAlive::Until { time, unit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://127.0.0.1:11434", "http://127.0.0.1", 11434)]
    #[case("http://gpu-box:8080", "http://gpu-box", 8080)]
    #[case("https://ollama.internal", "https://ollama.internal", 11434)]
    fn test_split_host(#[case] raw: &str, #[case] host: &str, #[case] port: u16) {
        assert_eq!(split_host(raw).unwrap(), (host.to_string(), port));
    }

    #[test]
    fn test_split_host_rejects_garbage() {
        let err = split_host("not a url").unwrap_err();
        assert_eq!(err.backend, BackendKind::Ollama);
    }

    #[test]
    fn test_parse_keep_alive() {
        assert!(matches!(parse_keep_alive("-1"), Ok(KeepAlive::Indefinitely)));
        assert!(matches!(parse_keep_alive("0"), Ok(KeepAlive::UnloadOnCompletion)));
        assert!(matches!(
            parse_keep_alive("10m"),
            Ok(KeepAlive::Until { time: 10, unit: TimeUnit::Minutes })
        ));
        assert!(matches!(
            parse_keep_alive("45"),
            Ok(KeepAlive::Until { time: 45, unit: TimeUnit::Seconds })
        ));
        assert!(matches!(
            parse_keep_alive("2h"),
            Ok(KeepAlive::Until { time: 2, unit: TimeUnit::Hours })
        ));
        assert!(parse_keep_alive("soon").is_err());
        assert!(parse_keep_alive("").is_err());
    }

    #[test]
    fn test_requires_model() {
        let err = OllamaBackend::new(&OllamaConfig::default()).err().unwrap();
        assert!(err.cause.contains("no local model"));
    }

    #[test]
    fn test_new_with_model() {
        let config = OllamaConfig {
            model: Some("llama3.2:3b".to_string()),
            ..Default::default()
        };
        let backend = OllamaBackend::new(&config).unwrap();
        assert_eq!(backend.model_name(), "llama3.2:3b");
        assert_eq!(backend.kind(), BackendKind::Ollama);
    }
}
