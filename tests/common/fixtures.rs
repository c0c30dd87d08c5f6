//! Index artifacts and pipelines built on temporary directories.

use super::mocks::{vocabulary_vector, RecordingBackend, VocabularyEmbedder, VOCABULARY};
use cvrag::llm::{BackendDescriptor, GenerationBackend, GenerationDispatcher};
use cvrag::rag::{ArtifactPaths, LazyEmbedder, MetadataStore, PromptBuilder, RagPipeline, Retriever};
use cvrag::types::Fragment;
use cvrag::utils::config::GenerationConfig;
use cvrag_index::{DistanceMetric, FlatIndex};
use std::path::Path;
use std::sync::Arc;

/// The two-fragment CV used throughout the suite.
pub fn cv_fragments() -> Vec<Fragment> {
    vec![
        Fragment::new("5 years experience in backend systems", "cv.txt"),
        Fragment::new("Graduated in 2019", "cv.txt"),
    ]
}

/// Embed `fragments` with the vocabulary embedder and persist both artifacts in `dir`.
pub fn write_artifacts(dir: &Path, fragments: &[Fragment]) -> ArtifactPaths {
    let paths = ArtifactPaths::in_dir(dir);
    let mut index = FlatIndex::new(VOCABULARY.len(), DistanceMetric::InnerProduct).unwrap();
    for fragment in fragments {
        index.add(&vocabulary_vector(&fragment.text)).unwrap();
    }
    index.save(&paths.index_file).unwrap();
    MetadataStore::new(fragments.to_vec())
        .save(&paths.meta_file)
        .unwrap();
    paths
}

/// A pipeline whose only backend is `backend`, always selected.
pub fn pipeline(
    paths: ArtifactPaths,
    top_k: usize,
    embedder: VocabularyEmbedder,
    backend: RecordingBackend,
) -> RagPipeline {
    let kind = backend.kind();
    let backend: Arc<dyn GenerationBackend> = Arc::new(backend);
    let dispatcher = GenerationDispatcher::new(
        GenerationConfig::default(),
        vec![BackendDescriptor::new(kind, |_| true, move |_| {
            Ok(Arc::clone(&backend))
        })],
    );

    RagPipeline::new(
        Retriever::new(paths, top_k, Arc::new(LazyEmbedder::ready(Arc::new(embedder)))),
        PromptBuilder::default(),
        dispatcher,
    )
}
