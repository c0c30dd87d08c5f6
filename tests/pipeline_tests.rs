//! End-to-end tests for the retrieval, prompting and generation pipeline.

mod common;

use common::fixtures::{cv_fragments, pipeline, write_artifacts};
use common::mocks::{RecordingBackend, VocabularyEmbedder};
use cvrag::llm::BackendKind;
use cvrag::rag::ArtifactPaths;
use cvrag::types::{AppError, Fragment};
use rstest::rstest;
use tempfile::TempDir;

#[tokio::test]
async fn test_cv_question_returns_both_fragments_in_rank_order() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let backend = RecordingBackend::new(BackendKind::OpenAI, "- 5 years of backend experience [1]");
    let pipeline = pipeline(paths, 2, VocabularyEmbedder::new(), backend.clone());

    let answer = pipeline.answer("How many years of experience?").await.unwrap();

    assert_eq!(answer.answer, "- 5 years of backend experience [1]");
    assert!(!answer.failed);
    assert_eq!(answer.backend, BackendKind::OpenAI);

    assert_eq!(answer.contexts.len(), 2);
    assert_eq!(answer.contexts[0].text(), "5 years experience in backend systems");
    assert_eq!(answer.contexts[0].rank, 0);
    assert_eq!(answer.contexts[1].text(), "Graduated in 2019");
    assert_eq!(answer.contexts[1].rank, 1);
    assert!(answer.contexts[0].score > answer.contexts[1].score);

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 1);
    let first = prompts[0].find("[1] (source: cv.txt)\n5 years experience").unwrap();
    let second = prompts[0].find("[2] (source: cv.txt)\nGraduated in 2019").unwrap();
    assert!(first < second);
    assert!(prompts[0].contains("Question: How many years of experience?"));
}

#[tokio::test]
async fn test_missing_artifacts_fail_before_embedding() {
    let dir = TempDir::new().unwrap();
    let embedder = VocabularyEmbedder::new();
    let backend = RecordingBackend::new(BackendKind::OpenAI, "unused");
    let pipeline = pipeline(
        ArtifactPaths::in_dir(dir.path()),
        2,
        embedder.clone(),
        backend.clone(),
    );

    let err = pipeline.answer("How many years of experience?").await.unwrap_err();

    assert!(matches!(err, AppError::IndexNotFound(_)));
    assert_eq!(embedder.call_count(), 0);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_missing_metadata_alone_is_index_not_found() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    std::fs::remove_file(&paths.meta_file).unwrap();
    let embedder = VocabularyEmbedder::new();

    let pipeline = pipeline(
        paths,
        2,
        embedder.clone(),
        RecordingBackend::new(BackendKind::OpenAI, "unused"),
    );

    let err = pipeline.answer("anything").await.unwrap_err();
    assert!(matches!(err, AppError::IndexNotFound(_)));
    assert_eq!(embedder.call_count(), 0);
}

#[rstest]
#[case(1, 1)]
#[case(2, 2)]
#[case(3, 2)]
#[case(10, 2)]
#[tokio::test]
async fn test_result_count_never_exceeds_top_k_or_index(#[case] top_k: usize, #[case] expected: usize) {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let pipeline = pipeline(
        paths,
        top_k,
        VocabularyEmbedder::new(),
        RecordingBackend::new(BackendKind::OpenAI, "ok"),
    );

    let answer = pipeline.answer("backend systems since 2019").await.unwrap();

    assert_eq!(answer.contexts.len(), expected);
    for (i, ctx) in answer.contexts.iter().enumerate() {
        assert_eq!(ctx.rank, i);
    }
    for pair in answer.contexts.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_backend_failure_keeps_contexts() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let pipeline = pipeline(
        paths,
        2,
        VocabularyEmbedder::new(),
        RecordingBackend::failing(BackendKind::OpenAI, "quota exceeded"),
    );

    let answer = pipeline.answer("How many years of experience?").await.unwrap();

    assert!(answer.failed);
    assert_eq!(answer.answer, "[ERROR OPENAI] quota exceeded");
    assert_eq!(answer.contexts.len(), 2);
}

#[tokio::test]
async fn test_empty_query_is_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let embedder = VocabularyEmbedder::new();
    let backend = RecordingBackend::new(BackendKind::OpenAI, "unused");
    let pipeline = pipeline(paths, 2, embedder.clone(), backend.clone());

    let err = pipeline.answer("   ").await.unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(embedder.call_count(), 0);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_out_of_range_top_k_is_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let embedder = VocabularyEmbedder::new();
    let backend = RecordingBackend::new(BackendKind::OpenAI, "unused");
    let pipeline = pipeline(paths, 2, embedder.clone(), backend.clone());

    for top_k in [0, usize::MAX] {
        let err = pipeline
            .answer_with("How many years of experience?", top_k)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
    assert_eq!(embedder.call_count(), 0);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_prompt_wraps_the_query_verbatim() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    let backend = RecordingBackend::new(BackendKind::OpenAI, "ok");
    let pipeline = pipeline(paths, 2, VocabularyEmbedder::new(), backend.clone());

    pipeline.answer("  How many years?  ").await.unwrap();

    assert!(backend.prompts()[0].contains("Question:   How many years?  \n"));
}

#[tokio::test]
async fn test_misaligned_metadata_is_structural() {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path(), &cv_fragments());
    cvrag::rag::MetadataStore::new(vec![Fragment::new("only one", "cv.txt")])
        .save(&paths.meta_file)
        .unwrap();

    let pipeline = pipeline(
        paths,
        2,
        VocabularyEmbedder::new(),
        RecordingBackend::new(BackendKind::OpenAI, "unused"),
    );

    let err = pipeline.answer("How many years?").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidIndex(_)));
    assert!(err.is_structural());
}

#[tokio::test]
async fn test_extra_metadata_survives_retrieval() {
    let dir = TempDir::new().unwrap();
    let mut fragment = Fragment::new("Graduated in 2019", "cv.txt");
    fragment
        .extra
        .insert("section".to_string(), serde_json::json!("education"));
    let paths = write_artifacts(dir.path(), &[fragment]);

    let pipeline = pipeline(
        paths,
        2,
        VocabularyEmbedder::new(),
        RecordingBackend::new(BackendKind::OpenAI, "ok"),
    );

    let answer = pipeline.answer("When graduated?").await.unwrap();
    assert_eq!(answer.contexts.len(), 1);
    assert_eq!(
        answer.contexts[0].fragment.extra.get("section"),
        Some(&serde_json::json!("education"))
    );
}
