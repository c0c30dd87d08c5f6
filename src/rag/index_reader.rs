//! Read-only access to the persisted index and its metadata.

use std::path::{Path, PathBuf};

use cvrag_index::{FlatIndex, Neighbors};
use serde::{Deserialize, Serialize};

use crate::types::{AppError, Fragment, Result};
use crate::utils::config::RetrievalConfig;

/// Locations of the two artifacts produced by ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub index_file: PathBuf,
    pub meta_file: PathBuf,
}

impl ArtifactPaths {
    pub fn new(index_file: impl Into<PathBuf>, meta_file: impl Into<PathBuf>) -> Self {
        Self {
            index_file: index_file.into(),
            meta_file: meta_file.into(),
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.index_path(), config.meta_path())
    }

    /// Both artifacts are in the same directory under their default names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let config = RetrievalConfig {
            index_dir: dir.as_ref().to_path_buf(),
            ..Default::default()
        };
        Self::from_config(&config)
    }

    pub fn exists(&self) -> bool {
        self.index_file.is_file() && self.meta_file.is_file()
    }

    /// Fail with [`AppError::IndexNotFound`] unless both files are present.
    pub fn ensure_exists(&self) -> Result<()> {
        let missing: Vec<String> = [&self.index_file, &self.meta_file]
            .into_iter()
            .filter(|path| !path.is_file())
            .map(|path| path.display().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::IndexNotFound(format!(
                "missing {}; run the ingestion step first",
                missing.join(" and ")
            )))
        }
    }
}

fn read_error(path: &Path, err: std::io::Error) -> AppError {
    AppError::InvalidIndex(format!("failed to read {}: {}", path.display(), err))
}

/// The fragment table stored next to the index, row-aligned with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataStore {
    pub chunks: Vec<Fragment>,
}

impl MetadataStore {
    pub fn new(chunks: Vec<Fragment>) -> Self {
        Self { chunks }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| read_error(path, e))?;
        Self::decode(path, &bytes)
    }

    pub async fn load_async(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| read_error(path, e))?;
        Self::decode(path, &bytes)
    }

    fn decode(path: &Path, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            AppError::InvalidIndex(format!("malformed metadata in {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| AppError::Internal(format!("failed to encode metadata: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| AppError::Internal(format!("failed to write {}: {}", path.display(), e)))
    }

    pub fn get(&self, row: usize) -> Option<&Fragment> {
        self.chunks.get(row)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// A loaded index together with its metadata.
///
/// Row `i` of the index always describes `metadata.chunks[i]`.
#[derive(Debug)]
pub struct IndexReader {
    index: FlatIndex,
    metadata: MetadataStore,
}

impl IndexReader {
    /// Pair an index with its metadata, checking they describe the same rows.
    pub fn from_parts(index: FlatIndex, metadata: MetadataStore) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(AppError::InvalidIndex(format!(
                "index holds {} vectors but metadata lists {} fragments",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self { index, metadata })
    }

    /// Load both artifacts from disk. Blocking.
    pub fn open(paths: &ArtifactPaths) -> Result<Self> {
        paths.ensure_exists()?;
        let index = FlatIndex::load(&paths.index_file)?;
        let metadata = MetadataStore::load(&paths.meta_file)?;
        Self::from_parts(index, metadata)
    }

    /// [`open`](Self::open) without blocking the async executor.
    pub async fn open_async(paths: ArtifactPaths) -> Result<Self> {
        paths.ensure_exists()?;
        let index = FlatIndex::load_async(&paths.index_file).await?;
        let metadata = MetadataStore::load_async(&paths.meta_file).await?;
        Self::from_parts(index, metadata)
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Nearest neighbours of `vector`. Empty slots carry the `-1` label.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Neighbors> {
        if vector.len() != self.index.dimensions() {
            return Err(AppError::InvalidIndex(format!(
                "query has {} dimensions but the index was built with {}",
                vector.len(),
                self.index.dimensions()
            )));
        }
        Ok(self.index.search(vector, k)?)
    }

    pub fn fragment(&self, row: usize) -> Option<&Fragment> {
        self.metadata.get(row)
    }
}
