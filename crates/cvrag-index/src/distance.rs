//! Distance metrics for vector similarity.
//!
//! The metric decides both how a neighbour is scored and in which direction
//! results are ranked, so it is stored with the index and never inferred.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance metric used by an index.
///
/// - **InnerProduct**: higher is closer. Equals cosine similarity when both
///   sides are L2-normalized, which is how text embeddings are produced.
/// - **L2**: squared Euclidean distance, lower is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Inner (dot) product.
    #[default]
    InnerProduct,

    /// Squared Euclidean distance.
    L2,
}

impl DistanceMetric {
    /// Score `b` against the query `a` using this metric.
    ///
    /// The returned value is in the metric's native units: a similarity for
    /// [`DistanceMetric::InnerProduct`], a squared distance for
    /// [`DistanceMetric::L2`].
    #[inline]
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::InnerProduct => dot_product(a, b),
            DistanceMetric::L2 => squared_l2(a, b),
        }
    }

    /// Returns true if score `a` ranks strictly ahead of score `b`.
    #[inline]
    pub fn is_closer(&self, a: f32, b: f32) -> bool {
        match self {
            DistanceMetric::InnerProduct => a > b,
            DistanceMetric::L2 => a < b,
        }
    }

    /// Score used to pad result slots that have no neighbour.
    pub fn worst_score(&self) -> f32 {
        match self {
            DistanceMetric::InnerProduct => f32::MIN,
            DistanceMetric::L2 => f32::MAX,
        }
    }

    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::InnerProduct => "inner_product",
            DistanceMetric::L2 => "l2",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Scale `vector` to unit length in place.
///
/// A zero vector is left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;

    // Manual loop unrolling for better performance
    let chunks = a.len() / 4;
    let remainder = a.len() % 4;

    for i in 0..chunks {
        let base = i * 4;
        sum += a[base] * b[base]
            + a[base + 1] * b[base + 1]
            + a[base + 2] * b[base + 2]
            + a[base + 3] * b[base + 3];
    }

    let start = chunks * 4;
    for i in 0..remainder {
        sum += a[start + i] * b[start + i];
    }

    sum
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
