//! Error taxonomy for index builds and searches
//!
//! Every variant carries the collection it concerns so callers can tell the
//! user what to rebuild or import.

use std::fmt;

use serde::Serialize;

use super::selector::InvalidCollectionName;
use crate::search::embedding::EmbeddingError;

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

/// What was missing for a `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Metadata,
    Index,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "no metadata (import records first)"),
            Self::Index => write!(f, "no index (run build first)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Build,
    Search,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Search => write!(f, "search"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("collection '{collection}': {kind}")]
    NotFound { collection: String, kind: Missing },

    #[error("collection '{collection}' has no records to index")]
    EmptyCollection { collection: String },

    #[error(
        "collection '{collection}': embedding dimension {actual} does not match index dimension {expected} (rebuild required)"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("collection '{collection}': corrupt index ({reason}); rebuild required")]
    CorruptIndex { collection: String, reason: String },

    #[error("collection '{collection}': embedding failed during {operation}: {source}")]
    UpstreamEmbedding {
        collection: String,
        operation: Operation,
        #[source]
        source: EmbeddingError,
    },

    #[error("collection '{collection}': build cancelled, previous index kept")]
    Cancelled { collection: String },

    #[error("collection '{collection}': invalid metadata: {reason}")]
    InvalidMetadata { collection: String, reason: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    InvalidName(#[from] InvalidCollectionName),

    #[error("index storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    pub fn not_found(collection: &str, kind: Missing) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            kind,
        }
    }

    pub fn corrupt(collection: &str, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable name, used in JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::EmptyCollection { .. } => "empty_collection",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::CorruptIndex { .. } => "corrupt_index",
            Self::UpstreamEmbedding { .. } => "upstream_embedding",
            Self::Cancelled { .. } => "cancelled",
            Self::InvalidMetadata { .. } => "invalid_metadata",
            Self::InvalidArgument(_) | Self::InvalidName(_) => "invalid_argument",
            Self::Storage(_) | Self::Io(_) | Self::Json(_) => "storage",
        }
    }
}

/// Non-fatal: the index row count no longer matches the record count.
///
/// Searches still run against the old index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleIndexWarning {
    pub collection: String,
    pub indexed: usize,
    pub current: usize,
}

impl fmt::Display for StaleIndexWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index for '{}' is stale: {} rows indexed, {} records now (rebuild to refresh)",
            self.collection, self.indexed, self.current
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_collection() {
        let err = SearchError::not_found("Sales", Missing::Index);
        assert_eq!(err.to_string(), "collection 'Sales': no index (run build first)");
        assert_eq!(err.code(), "not_found");

        let err = SearchError::DimensionMismatch {
            collection: "HR".to_string(),
            expected: 384,
            actual: 768,
        };
        assert!(err.to_string().contains("768"));
        assert!(err.to_string().contains("'HR'"));
    }

    #[test]
    fn test_stale_warning_display() {
        let warning = StaleIndexWarning {
            collection: "All".to_string(),
            indexed: 3,
            current: 4,
        };
        assert_eq!(
            warning.to_string(),
            "index for 'All' is stale: 3 rows indexed, 4 records now (rebuild to refresh)"
        );
    }
}
