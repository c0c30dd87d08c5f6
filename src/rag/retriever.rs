use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::rag::embeddings::LazyEmbedder;
use crate::rag::index_reader::{ArtifactPaths, IndexReader};
use crate::types::{AppError, Result, ScoredFragment};
use crate::utils::config::RetrievalConfig;

/// Turns a query into its `top_k` closest fragments.
///
/// Artifacts are checked before the embedder is touched, so a missing index
/// never triggers a model load.
pub struct Retriever {
    paths: ArtifactPaths,
    top_k: usize,
    embedder: Arc<LazyEmbedder>,
    cache: Option<OnceCell<Arc<IndexReader>>>,
}

impl Retriever {
    pub fn new(paths: ArtifactPaths, top_k: usize, embedder: Arc<LazyEmbedder>) -> Self {
        Self {
            paths,
            top_k,
            embedder,
            cache: None,
        }
    }

    pub fn from_config(config: &RetrievalConfig, embedder: Arc<LazyEmbedder>) -> Self {
        Self::new(ArtifactPaths::from_config(config), config.top_k, embedder)
            .with_cache(config.cache_index)
    }

    /// Keep the artifacts in memory after the first successful load.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(OnceCell::new);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn embedder(&self) -> &Arc<LazyEmbedder> {
        &self.embedder
    }

    async fn reader(&self) -> Result<Arc<IndexReader>> {
        match &self.cache {
            Some(cell) => cell
                .get_or_try_init(|| async {
                    Ok(Arc::new(IndexReader::open_async(self.paths.clone()).await?))
                })
                .await
                .map(Arc::clone),
            None => Ok(Arc::new(IndexReader::open_async(self.paths.clone()).await?)),
        }
    }

    /// Retrieve with the configured `top_k`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredFragment>> {
        self.retrieve_k(query, self.top_k).await
    }

    /// Retrieve at most `k` fragments, closest first.
    #[instrument(skip(self, query))]
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<Vec<ScoredFragment>> {
        if self.cache.as_ref().map_or(true, |cell| !cell.initialized()) {
            self.paths.ensure_exists()?;
        }

        let reader = self.reader().await?;
        let vector = self.embedder.embed_one(query).await?;
        let neighbors = reader.search(&vector, k)?;

        let mut results = Vec::with_capacity(k.min(reader.len()));
        for (_, row, score) in neighbors.hits() {
            let fragment = reader.fragment(row).ok_or_else(|| {
                AppError::InvalidIndex(format!("index returned row {} with no metadata", row))
            })?;
            results.push(ScoredFragment {
                fragment: fragment.clone(),
                score,
                rank: results.len(),
            });
        }

        debug!(found = results.len(), "Retrieved fragments");
        Ok(results)
    }
}
