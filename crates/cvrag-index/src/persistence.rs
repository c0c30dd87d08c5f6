//! Persistence layer for cvrag-index.
//!
//! An index file is the 4-byte magic `CVIX` followed by a postcard-encoded
//! [`IndexFile`] record. Writes go through a temporary sibling file and a
//! rename so readers never observe a half-written index.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::FlatIndex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const MAGIC: &[u8; 4] = b"CVIX";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    metric: DistanceMetric,
    dimensions: u64,
    data: Vec<f32>,
}

/// Encode an index into its on-disk byte representation.
pub fn to_bytes(index: &FlatIndex) -> Result<Vec<u8>> {
    let record = IndexFile {
        version: FORMAT_VERSION,
        metric: index.metric(),
        dimensions: index.dimensions() as u64,
        data: index.raw().to_vec(),
    };

    let payload = postcard::to_allocvec(&record)
        .map_err(|e| Error::Persistence(format!("Failed to encode index: {}", e)))?;

    let mut bytes = Vec::with_capacity(MAGIC.len() + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode an index from its on-disk byte representation.
pub fn from_bytes(bytes: &[u8]) -> Result<FlatIndex> {
    let payload = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| Error::Persistence("Not a cvrag index file (bad magic)".to_string()))?;

    let record: IndexFile = postcard::from_bytes(payload)
        .map_err(|e| Error::Persistence(format!("Failed to decode index: {}", e)))?;

    if record.version != FORMAT_VERSION {
        return Err(Error::Persistence(format!(
            "Unsupported index format version {} (expected {})",
            record.version, FORMAT_VERSION
        )));
    }

    let dimensions = usize::try_from(record.dimensions)
        .map_err(|_| Error::Persistence("Dimension count overflows usize".to_string()))?;

    FlatIndex::from_raw(dimensions, record.metric, record.data)
}

impl FlatIndex {
    /// Write the index to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = to_bytes(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;

        info!(path = ?path, vectors = self.len(), dims = self.dimensions(), "Saved index");
        Ok(())
    }

    /// Read an index from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let index = from_bytes(&bytes)?;
        debug!(path = ?path, vectors = index.len(), metric = %index.metric(), "Loaded index");
        Ok(index)
    }

    /// Read an index from `path` without blocking the async executor.
    pub async fn load_async(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let index = from_bytes(&bytes)?;
        debug!(path = ?path, vectors = index.len(), metric = %index.metric(), "Loaded index");
        Ok(index)
    }
}
