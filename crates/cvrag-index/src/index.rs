//! Exact (brute-force) vector index.
//!
//! Vectors are stored row-major in a single buffer. Row `i` is the `i`-th
//! vector added, and that position is the label returned by [`FlatIndex::search`],
//! so callers can keep any side table aligned with it by position alone.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use tracing::trace;

/// Label returned for result slots that have no neighbour.
pub const NO_NEIGHBOR: i64 = -1;

/// Outcome of a k-nearest-neighbour search.
///
/// A result always has `k` slots. Only real neighbours are stored; slots past
/// the number of stored vectors read as [`NO_NEIGHBOR`] with the metric's
/// worst score, so a huge `k` costs nothing beyond the index size.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors {
    k: usize,
    distances: Vec<f32>,
    labels: Vec<i64>,
    worst: f32,
}

impl Neighbors {
    /// Number of result slots, always the requested `k`.
    pub fn len(&self) -> usize {
        self.k
    }

    /// True only for a `k == 0` search.
    pub fn is_empty(&self) -> bool {
        self.k == 0
    }

    /// Label in slot `rank`, or `None` past `k`.
    pub fn label(&self, rank: usize) -> Option<i64> {
        if rank >= self.k {
            return None;
        }
        Some(self.labels.get(rank).copied().unwrap_or(NO_NEIGHBOR))
    }

    /// Score in slot `rank`, or `None` past `k`.
    pub fn distance(&self, rank: usize) -> Option<f32> {
        if rank >= self.k {
            return None;
        }
        Some(self.distances.get(rank).copied().unwrap_or(self.worst))
    }

    /// All `k` labels in rank order, padded with [`NO_NEIGHBOR`].
    pub fn labels(&self) -> impl Iterator<Item = i64> + '_ {
        let padding = self.k - self.labels.len();
        self.labels
            .iter()
            .copied()
            .chain(std::iter::repeat(NO_NEIGHBOR).take(padding))
    }

    /// All `k` scores in rank order, padded with the worst score.
    pub fn distances(&self) -> impl Iterator<Item = f32> + '_ {
        let padding = self.k - self.distances.len();
        self.distances
            .iter()
            .copied()
            .chain(std::iter::repeat(self.worst).take(padding))
    }

    /// Iterate over `(rank, label, distance)` for real neighbours only.
    pub fn hits(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.labels
            .iter()
            .zip(self.distances.iter())
            .enumerate()
            .filter_map(|(rank, (&label, &distance))| {
                usize::try_from(label).ok().map(|row| (rank, row, distance))
            })
    }
}

/// Exact nearest-neighbour index over fixed-length `f32` vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    metric: DistanceMetric,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidVector("Dimensions must be > 0".to_string()));
        }

        Ok(Self {
            dimensions,
            metric,
            data: Vec::new(),
        })
    }

    /// Rebuild an index from a raw row-major buffer.
    pub(crate) fn from_raw(dimensions: usize, metric: DistanceMetric, data: Vec<f32>) -> Result<Self> {
        if dimensions == 0 || data.len() % dimensions != 0 {
            return Err(Error::Persistence(format!(
                "Buffer of {} floats is not a whole number of {}-dimensional rows",
                data.len(),
                dimensions
            )));
        }

        Ok(Self {
            dimensions,
            metric,
            data,
        })
    }

    /// Get the vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Get the number of vectors in the index.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    /// Append a vector and return its row label.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.validate(vector)?;
        self.data.extend_from_slice(vector);
        Ok(self.len() - 1)
    }

    /// Get the stored vector at `row`.
    pub fn get(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    /// Find the `k` nearest stored vectors to `query`.
    ///
    /// Results are ranked by the index metric; equal scores keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Neighbors> {
        self.validate(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .map(|row| self.metric.score(query, row))
            .enumerate()
            .collect();

        let metric = self.metric;
        // Stable sort keeps insertion order for ties.
        scored.sort_by(|a, b| {
            if metric.is_closer(a.1, b.1) {
                std::cmp::Ordering::Less
            } else if metric.is_closer(b.1, a.1) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        scored.truncate(k);

        let (labels, distances) = scored
            .into_iter()
            .map(|(row, score)| (row as i64, score))
            .unzip();

        trace!(k, stored = self.len(), "Flat search complete");
        Ok(Neighbors {
            k,
            distances,
            labels,
            worst: metric.worst_score(),
        })
    }

    fn validate(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidVector(
                "Vector contains NaN or infinite values".to_string(),
            ));
        }
        Ok(())
    }
}
