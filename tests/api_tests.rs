//! HTTP surface tests using axum-test.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::fixtures::{cv_fragments, pipeline, write_artifacts};
use common::mocks::{RecordingBackend, VocabularyEmbedder};
use cvrag::llm::BackendKind;
use cvrag::rag::ArtifactPaths;
use cvrag::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;

fn server(paths: ArtifactPaths, backend: RecordingBackend) -> TestServer {
    let state = AppState::new(pipeline(paths, 2, VocabularyEmbedder::new(), backend));
    TestServer::new(cvrag::api::routes::app(state)).unwrap()
}

#[tokio::test]
async fn test_health_reports_index_readiness() {
    let dir = TempDir::new().unwrap();
    let server = server(
        ArtifactPaths::in_dir(dir.path()),
        RecordingBackend::new(BackendKind::OpenAI, "unused"),
    );

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["index_ready"], false);
    assert_eq!(body["backend"], "openai");
}

#[tokio::test]
async fn test_ask_returns_answer_and_contexts() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let server = server(paths, RecordingBackend::new(BackendKind::OpenAI, "- 5 years [1]"));

    let response = server
        .post("/api/ask")
        .json(&json!({ "query": "How many years of experience?" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["answer"], "- 5 years [1]");
    assert_eq!(body["backend"], "openai");
    assert_eq!(body["failed"], false);

    let contexts = body["contexts"].as_array().unwrap();
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0]["text"], "5 years experience in backend systems");
    assert_eq!(contexts[0]["source"], "cv.txt");
    assert_eq!(contexts[0]["rank"], 0);
    assert!(contexts[0]["score"].is_number());
}

#[tokio::test]
async fn test_backend_failure_is_still_200() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let server = server(paths, RecordingBackend::failing(BackendKind::OpenAI, "timed out"));

    let response = server
        .post("/api/ask")
        .json(&json!({ "query": "How many years of experience?" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["failed"], true);
    assert_eq!(body["answer"], "[ERROR OPENAI] timed out");
    assert_eq!(body["contexts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_index_is_503() {
    let dir = TempDir::new().unwrap();
    let server = server(
        ArtifactPaths::in_dir(dir.path()),
        RecordingBackend::new(BackendKind::OpenAI, "unused"),
    );

    let response = server
        .post("/api/ask")
        .json(&json!({ "query": "How many years of experience?" }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().starts_with("Index not found"));
}

#[tokio::test]
async fn test_empty_query_is_400() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let backend = RecordingBackend::new(BackendKind::OpenAI, "unused");
    let server = server(paths, backend.clone());

    let response = server.post("/api/ask").json(&json!({ "query": "" })).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(backend.call_count(), 0);
}
