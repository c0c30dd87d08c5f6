//! Backend selection through the standard dispatcher chain.
//!
//! The OpenAI-compatible endpoint is mocked with wiremock, so the default
//! path is exercised over real HTTP without leaving the machine.

#![cfg(feature = "openai")]

use cvrag::llm::{BackendKind, GenerationDispatcher};
use cvrag::utils::config::GenerationConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

fn mock_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
            "logprobs": null
        }],
        "usage": { "prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49 }
    })
}

fn openai_config(server: &MockServer) -> GenerationConfig {
    let mut config = GenerationConfig::default();
    config.openai.api_key = Some("sk-test".to_string());
    config.openai.api_base = format!("{}/v1", server.uri());
    config
}

// ============= Default Path =============

#[tokio::test]
async fn test_default_path_called_exactly_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system" },
                { "role": "user", "content": "grounded prompt" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_completion("- 5 years [1]")))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = GenerationDispatcher::standard(openai_config(&server), "English");
    assert_eq!(dispatcher.selected_kind(), Some(BackendKind::OpenAI));

    let generation = dispatcher.generate("grounded prompt").await;

    assert_eq!(generation.backend, BackendKind::OpenAI);
    assert_eq!(generation.outcome, Ok("- 5 years [1]".to_string()));
}

#[tokio::test]
async fn test_system_instruction_carries_language() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{
                "role": "system",
                "content": "You are a concise and precise assistant. Answer in Spanish and cite the provided sources when relevant."
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_completion("- 5 años")))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = GenerationDispatcher::standard(openai_config(&server), "Spanish");
    assert_eq!(dispatcher.generate_text("prompt").await, "- 5 años");
}

#[tokio::test]
async fn test_default_path_error_is_tagged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = GenerationDispatcher::standard(openai_config(&server), "English");
    let generation = dispatcher.generate("prompt").await;

    assert!(generation.is_failure());
    assert_eq!(generation.backend, BackendKind::OpenAI);
    assert!(generation.render().starts_with("[ERROR OPENAI] "));
}

#[tokio::test]
async fn test_empty_choices_is_malformed() {
    let server = MockServer::start().await;

    let mut body = mock_completion("unused");
    body["choices"] = json!([]);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let dispatcher = GenerationDispatcher::standard(openai_config(&server), "English");
    assert_eq!(
        dispatcher.generate_text("prompt").await,
        "[ERROR OPENAI] response contained no message content"
    );
}

// ============= Selection =============

#[tokio::test]
async fn test_configured_vendor_a_never_reaches_default_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = openai_config(&server);
    config.anthropic.api_key = Some("sk-ant-test".to_string());

    let dispatcher = GenerationDispatcher::standard(config, "English");
    assert_eq!(dispatcher.selected_kind(), Some(BackendKind::Anthropic));
}

#[test]
fn test_local_model_wins_over_every_credential() {
    let mut config = GenerationConfig::default();
    config.ollama.model = Some("llama3.2:3b".to_string());
    config.anthropic.api_key = Some("sk-ant-test".to_string());
    config.openai.api_key = Some("sk-test".to_string());

    let dispatcher = GenerationDispatcher::standard(config, "English");
    assert_eq!(dispatcher.selected_kind(), Some(BackendKind::Ollama));
}
