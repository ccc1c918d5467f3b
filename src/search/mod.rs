//! Semantic search over dashboard collections
//!
//! metadata store -> embedder -> vector index -> index store, driven by the
//! collection manager and the search engine.

pub mod collection;
pub mod embedding;
pub mod engine;
pub mod index;
pub mod store;
pub mod vectordb;

#[cfg(test)]
pub(crate) mod testing;

pub use collection::{BuildReport, CancelFlag, CollectionManager, CollectionStatus};
pub use embedding::{Embedder, EmbeddingError, HtpEmbedder};
pub use engine::{SearchEngine, SearchHit, SearchOutcome};
pub use index::{Metric, VectorIndex};
pub use store::MetadataStore;
pub use vectordb::IndexStore;
