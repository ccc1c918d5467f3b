//! dashsearch library
//!
//! Semantic search over dashboard metadata, one index per workbook plus an
//! aggregate `All` index.
//!
//! # Modules
//!
//! - `core`: records, collection selectors, errors, workspace config
//! - `search`: embedding, vector index, storage, search engine

pub mod core;
pub mod search;

// Re-exports for convenience
pub use crate::core::config::Config;
pub use crate::core::error::{Result, SearchError, StaleIndexWarning};
pub use crate::core::paths::WorkspacePaths;
pub use crate::core::record::{DashboardRecord, KpiEntry, ScopedRecord};
pub use crate::core::selector::CollectionSelector;
pub use crate::search::{SearchEngine, SearchHit, SearchOutcome};
