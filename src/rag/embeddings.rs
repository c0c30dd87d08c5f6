//! Text embedding.
//!
//! Query vectors must come from the same model the index was built with, and
//! that model must already be in the local cache: nothing is downloaded at
//! query time. Outputs are L2-normalized so inner product equals cosine
//! similarity.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::types::{AppError, Result};
use crate::utils::config::EmbeddingConfig;

// ============================================================================
// Embedder Trait
// ============================================================================

/// Converts text into fixed-length, unit-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;
}

// ============================================================================
// Embedding Model Types
// ============================================================================

/// Supported embedding models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingModelType {
    /// Multilingual paraphrase MiniLM, 384 dimensions
    #[default]
    ParaphraseMultilingualMiniLmL12V2,
    /// BGE small English v1.5, 384 dimensions
    BgeSmallEnV15,
    /// all-MiniLM-L6-v2, 384 dimensions
    AllMiniLmL6V2,
    /// Multilingual E5 small, 384 dimensions
    MultilingualE5Small,
}

impl EmbeddingModelType {
    /// Hugging Face repository the ONNX weights are fetched from at ingestion time
    pub fn repository(&self) -> &'static str {
        match self {
            Self::ParaphraseMultilingualMiniLmL12V2 => {
                "Xenova/paraphrase-multilingual-MiniLM-L12-v2"
            }
            Self::BgeSmallEnV15 => "Xenova/bge-small-en-v1.5",
            Self::AllMiniLmL6V2 => "Qdrant/all-MiniLM-L6-v2-onnx",
            Self::MultilingualE5Small => "intfloat/multilingual-e5-small",
        }
    }

    pub fn dimensions(&self) -> usize {
        384
    }

    #[cfg(feature = "local-embeddings")]
    pub fn to_fastembed_model(&self) -> fastembed::EmbeddingModel {
        use fastembed::EmbeddingModel;
        match self {
            Self::ParaphraseMultilingualMiniLmL12V2 => EmbeddingModel::ParaphraseMLMiniLML12V2,
            Self::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            Self::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            Self::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
        }
    }
}

impl FromStr for EmbeddingModelType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        // Accept both short names and full repository ids.
        let name = s.rsplit('/').next().unwrap_or(s).to_lowercase();
        match name.as_str() {
            "paraphrase-multilingual-minilm-l12-v2" => Ok(Self::ParaphraseMultilingualMiniLmL12V2),
            "bge-small-en-v1.5" | "bge-small-en-v15" => Ok(Self::BgeSmallEnV15),
            "all-minilm-l6-v2" | "all-minilm-l6-v2-onnx" => Ok(Self::AllMiniLmL6V2),
            "multilingual-e5-small" => Ok(Self::MultilingualE5Small),
            _ => Err(AppError::Configuration(format!(
                "Unknown embedding model: {}. Use one of: paraphrase-multilingual-minilm-l12-v2, \
                 bge-small-en-v1.5, all-minilm-l6-v2, multilingual-e5-small",
                s
            ))),
        }
    }
}

impl std::fmt::Display for EmbeddingModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ParaphraseMultilingualMiniLmL12V2 => "paraphrase-multilingual-minilm-l12-v2",
            Self::BgeSmallEnV15 => "bge-small-en-v1.5",
            Self::AllMiniLmL6V2 => "all-minilm-l6-v2",
            Self::MultilingualE5Small => "multilingual-e5-small",
        };
        write!(f, "{}", name)
    }
}

/// Find the cached snapshot directory for `model` under `cache_dir`.
///
/// The cache uses the Hugging Face hub layout:
/// `<cache_dir>/models--<org>--<name>/snapshots/<revision>/`.
pub fn locate_cached_model(cache_dir: &Path, model: EmbeddingModelType) -> Result<PathBuf> {
    let repo_dir = cache_dir.join(format!("models--{}", model.repository().replace('/', "--")));
    let snapshots = repo_dir.join("snapshots");

    let unavailable = || {
        AppError::ModelUnavailable(format!(
            "{} is not in the local cache at {}",
            model.repository(),
            cache_dir.display()
        ))
    };

    let entries = std::fs::read_dir(&snapshots).map_err(|_| unavailable())?;
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.is_dir())
        .ok_or_else(unavailable)
}

/// Whether this build can run a local embedding model at all.
pub const LOCAL_RUNTIME: bool = cfg!(feature = "local-embeddings");

/// Check that `model` can be loaded offline: the cache holds a snapshot and
/// the build carries the embedding runtime. Returns the snapshot directory.
pub fn check_local_model(cache_dir: &Path, model: EmbeddingModelType) -> Result<PathBuf> {
    let snapshot = locate_cached_model(cache_dir, model)?;
    if !LOCAL_RUNTIME {
        return Err(runtime_missing(model));
    }
    Ok(snapshot)
}

fn runtime_missing(model: EmbeddingModelType) -> AppError {
    AppError::ModelUnavailable(format!(
        "{} is cached but this build has no local embedding runtime (enable the `local-embeddings` feature)",
        model
    ))
}

// ============================================================================
// fastembed Implementation
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{InitOptions, TextEmbedding};

    /// ONNX embedding model loaded from the local cache
    pub struct FastEmbedder {
        model: Arc<tokio::sync::Mutex<TextEmbedding>>,
        kind: EmbeddingModelType,
    }

    impl FastEmbedder {
        /// Load `kind` from `cache_dir`. Blocking; call from `spawn_blocking`.
        pub fn load(kind: EmbeddingModelType, cache_dir: &Path) -> Result<Self> {
            locate_cached_model(cache_dir, kind)?;

            let options = InitOptions::new(kind.to_fastembed_model())
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(false);

            let model = TextEmbedding::try_new(options).map_err(|e| {
                AppError::ModelUnavailable(format!("Failed to load {}: {}", kind, e))
            })?;

            Ok(Self {
                model: Arc::new(tokio::sync::Mutex::new(model)),
                kind,
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();

            let mut vectors = tokio::task::spawn_blocking(move || {
                let mut model = model.blocking_lock();
                model.embed(texts, None)
            })
            .await
            .map_err(|e| AppError::Internal(format!("Embedding task failed: {}", e)))?
            .map_err(|e| AppError::Embedding(e.to_string()))?;

            for vector in &mut vectors {
                cvrag_index::normalize(vector);
            }
            Ok(vectors)
        }

        fn dimensions(&self) -> usize {
            self.kind.dimensions()
        }
    }
}

// ============================================================================
// Lazy Handle
// ============================================================================

type Factory = Arc<dyn Fn() -> Result<Arc<dyn Embedder>> + Send + Sync>;

/// An owned, lazily initialised embedder.
///
/// The factory runs on the blocking pool the first time the embedder is
/// needed and at most once, even when several queries arrive together. A
/// failed initialisation is not remembered, so the next call tries again.
pub struct LazyEmbedder {
    factory: Factory,
    cell: OnceCell<Arc<dyn Embedder>>,
}

impl LazyEmbedder {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            cell: OnceCell::new(),
        }
    }

    /// Wrap an embedder that is already constructed.
    pub fn ready(embedder: Arc<dyn Embedder>) -> Self {
        let shared = Arc::clone(&embedder);
        Self {
            factory: Arc::new(move || Ok(Arc::clone(&shared))),
            cell: OnceCell::new_with(Some(embedder)),
        }
    }

    /// Build the handle for the configured model.
    ///
    /// An unknown model name fails here; a model missing from the cache
    /// fails on first use with [`AppError::ModelUnavailable`].
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let kind: EmbeddingModelType = config.model.parse()?;
        let cache_dir = config.cache_dir.clone();

        Ok(Self::new(move || load_local(kind, &cache_dir)))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// The shared embedder, constructing it on first use.
    pub async fn get(&self) -> Result<Arc<dyn Embedder>> {
        self.cell
            .get_or_try_init(|| async {
                let factory = Arc::clone(&self.factory);
                tracing::info!("Loading embedding model");
                tokio::task::spawn_blocking(move || factory())
                    .await
                    .map_err(|e| AppError::Internal(format!("Embedder init task failed: {}", e)))?
            })
            .await
            .map(Arc::clone)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = self.get().await?;
        embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("embedder returned no vector".to_string()))
    }
}

impl std::fmt::Debug for LazyEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEmbedder")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "local-embeddings")]
fn load_local(kind: EmbeddingModelType, cache_dir: &Path) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(FastEmbedder::load(kind, cache_dir)?))
}

#[cfg(not(feature = "local-embeddings"))]
fn load_local(kind: EmbeddingModelType, cache_dir: &Path) -> Result<Arc<dyn Embedder>> {
    locate_cached_model(cache_dir, kind)?;
    Err(runtime_missing(kind))
}
