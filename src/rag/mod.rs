//! Retrieval Augmented Generation (RAG) pipeline
//!
//! Answers questions about a fixed document collection (a CV, typically)
//! by grounding a generated answer in fragments retrieved from a prebuilt
//! vector index.
//!
//! # Module Structure
//!
//! - [`rag::embeddings`](crate::rag::embeddings) - Query embedding from a locally cached model
//! - [`rag::index_reader`](crate::rag::index_reader) - Persisted index and metadata, read-only
//! - [`rag::retriever`](crate::rag::retriever) - Query to top-K scored fragments
//! - [`rag::prompt`](crate::rag::prompt) - Grounded prompt rendering
//! - [`rag::pipeline`](crate::rag::pipeline) - The orchestrator tying it all together
//!
//! # Flow
//!
//! 1. **Retrieval** - Artifacts checked, query embedded, nearest fragments looked up
//! 2. **Prompting** - Fragments numbered and wrapped in the answer template
//! 3. **Generation** - The configured backend answers; failures come back inline
//!
//! Index construction happens offline and is not part of this crate's query path.
//!
//! # Example
//!
//! ```ignore
//! use cvrag::rag::RagPipeline;
//!
//! let pipeline = RagPipeline::from_config(&config)?;
//! let answer = pipeline.answer("How many years of experience?").await?;
//! println!("{}", answer.answer);
//! for ctx in &answer.contexts {
//!     println!("[{}] {} ({:.3})", ctx.rank + 1, ctx.source(), ctx.score);
//! }
//! ```

pub mod embeddings;
pub mod index_reader;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use embeddings::{Embedder, EmbeddingModelType, LazyEmbedder};
pub use index_reader::{ArtifactPaths, IndexReader, MetadataStore};
pub use pipeline::{RagAnswer, RagPipeline};
pub use prompt::PromptBuilder;
pub use retriever::Retriever;
