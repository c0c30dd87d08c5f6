//! # cvrag-index
//!
//! A small exact vector index with a compact on-disk format.
//!
//! The index is built offline, persisted once, and then opened read-only by
//! the query path. Every vector keeps the position it was added at, so a
//! metadata table stored next to the index stays aligned by row number.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cvrag_index::{DistanceMetric, FlatIndex, normalize};
//!
//! let mut index = FlatIndex::new(384, DistanceMetric::InnerProduct)?;
//! let mut v = embed("5 years experience in backend systems");
//! normalize(&mut v);
//! index.add(&v)?;
//! index.save("storage/index.bin")?;
//!
//! let index = FlatIndex::load("storage/index.bin")?;
//! let hits = index.search(&query_vector, 2)?;
//! for (rank, row, score) in hits.hits() {
//!     println!("{rank}: row {row} scored {score}");
//! }
//! ```
//!
//! Searches always report exactly `k` slots. When fewer than `k` vectors are
//! stored the remaining labels read as [`NO_NEIGHBOR`] (`-1`); the padding is
//! never materialised.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;

pub use distance::{normalize, DistanceMetric};
pub use error::{Error, Result};
pub use index::{FlatIndex, Neighbors, NO_NEIGHBOR};
