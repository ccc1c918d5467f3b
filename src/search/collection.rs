//! Collection manager - selectors to (records, index) pairs
//!
//! `All` is never stored as metadata: its record set is recomputed from the
//! workbooks each time it is resolved or rebuilt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use super::embedding::{embed_checked, Embedder};
use super::index::{IndexError, Metric, VectorIndex};
use super::store::MetadataStore;
use super::vectordb::{IndexEntry, IndexStore, IndexSummary, IndexedCollection};
use crate::core::config::DEFAULT_BATCH_SIZE;
use crate::core::error::{Missing, Operation, Result, SearchError, StaleIndexWarning};
use crate::core::record::ScopedRecord;
use crate::core::selector::CollectionSelector;

/// Shared flag for abandoning a running build.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A selector resolved against storage.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub selector: CollectionSelector,
    pub records: Vec<ScopedRecord>,
    pub index: IndexedCollection,
    pub warning: Option<StaleIndexWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub collection: String,
    pub rows: usize,
    pub dimension: usize,
    pub batches: usize,
    pub duration_ms: u128,
}

/// One line of the collection listing.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub collection: String,
    pub records: Option<usize>,
    pub index: Option<IndexSummary>,
    pub stale: bool,
    /// Index left behind by a workbook whose metadata document is gone
    pub orphaned: bool,
}

pub struct CollectionManager {
    metadata: MetadataStore,
    indexes: IndexStore,
    metric: Metric,
    batch_size: usize,
}

impl CollectionManager {
    pub fn new(metadata: MetadataStore, indexes: IndexStore) -> Self {
        Self {
            metadata,
            indexes,
            metric: Metric::L2,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn indexes(&self) -> &IndexStore {
        &self.indexes
    }

    /// Every workbook followed by `All`.
    pub fn selectors(&self) -> Result<Vec<CollectionSelector>> {
        let mut selectors: Vec<CollectionSelector> = self
            .metadata
            .list_collections()?
            .into_iter()
            .map(CollectionSelector::Workbook)
            .collect();
        selectors.push(CollectionSelector::All);
        Ok(selectors)
    }

    /// Records a rebuild of `selector` would index right now.
    pub fn current_records(&self, selector: &CollectionSelector) -> Result<Vec<ScopedRecord>> {
        match selector {
            CollectionSelector::All => self.metadata.aggregate(),
            CollectionSelector::Workbook(name) => Ok(self
                .metadata
                .load(name)?
                .into_iter()
                .map(|record| ScopedRecord {
                    collection: name.clone(),
                    record,
                })
                .collect()),
        }
    }

    pub fn resolve(&self, selector: &CollectionSelector) -> Result<Resolved> {
        let collection = selector.name();
        let index = self
            .indexes
            .load(collection)?
            .ok_or_else(|| SearchError::not_found(collection, Missing::Index))?;

        let records = self.current_records(selector)?;
        let warning = stale_warning(collection, &index, records.len());
        if let Some(w) = &warning {
            tracing::warn!(collection, indexed = w.indexed, current = w.current, "stale index");
        }

        Ok(Resolved {
            selector: selector.clone(),
            records,
            index,
            warning,
        })
    }

    /// Re-embed every current record of `selector` and swap in a new index.
    ///
    /// Nothing is written until every batch has been embedded; errors and
    /// cancellation leave the previous index live.
    pub fn rebuild_index(
        &mut self,
        selector: &CollectionSelector,
        embedder: &dyn Embedder,
        cancel: Option<&CancelFlag>,
    ) -> Result<BuildReport> {
        let start = Instant::now();
        let collection = selector.name();

        let records = self.current_records(selector)?;
        if records.is_empty() {
            return Err(SearchError::EmptyCollection {
                collection: collection.to_string(),
            });
        }

        let texts: Vec<String> = records.iter().map(|s| s.record.embedding_text()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        let mut batches = 0;

        for chunk in texts.chunks(self.batch_size) {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                tracing::info!(collection, embedded = vectors.len(), "build cancelled");
                return Err(SearchError::Cancelled {
                    collection: collection.to_string(),
                });
            }

            let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
            let embedded =
                embed_checked(embedder, &refs).map_err(|source| SearchError::UpstreamEmbedding {
                    collection: collection.to_string(),
                    operation: Operation::Build,
                    source,
                })?;
            vectors.extend(embedded);
            batches += 1;
        }

        if cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(SearchError::Cancelled {
                collection: collection.to_string(),
            });
        }

        let index = VectorIndex::build(&vectors, self.metric)
            .map_err(|e| index_error(collection, e))?;
        let entries = records
            .iter()
            .enumerate()
            .map(|(row, scoped)| IndexEntry {
                row,
                collection: scoped.collection.clone(),
                id: scoped.record.id.clone(),
            })
            .collect();

        let built = IndexedCollection {
            index,
            entries,
            embedder: embedder.name().to_string(),
            built_at: Utc::now(),
        };
        self.indexes.replace(collection, &built)?;

        let report = BuildReport {
            collection: collection.to_string(),
            rows: built.rows(),
            dimension: built.index.dimension(),
            batches,
            duration_ms: start.elapsed().as_millis(),
        };
        tracing::info!(
            collection,
            rows = report.rows,
            dimension = report.dimension,
            duration_ms = report.duration_ms as u64,
            "index built"
        );

        Ok(report)
    }

    /// Record and index counts for every selector, then any orphaned index.
    pub fn status(&self) -> Result<Vec<CollectionStatus>> {
        let mut summaries = self.indexes.stats()?;

        let mut result = Vec::new();
        for selector in self.selectors()? {
            let collection = selector.name().to_string();
            let records = match self.current_records(&selector) {
                Ok(records) => Some(records.len()),
                Err(SearchError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            };
            let index = summaries
                .iter()
                .position(|s| s.collection == collection)
                .map(|i| summaries.remove(i));
            let stale = matches!((&index, records), (Some(i), Some(n)) if i.rows != n);

            result.push(CollectionStatus {
                collection,
                records,
                index,
                stale,
                orphaned: false,
            });
        }

        for summary in summaries {
            result.push(CollectionStatus {
                collection: summary.collection.clone(),
                records: None,
                index: Some(summary),
                stale: false,
                orphaned: true,
            });
        }
        Ok(result)
    }

    /// Remove indexes whose workbook no longer has a metadata document.
    pub fn prune_orphans(&mut self) -> Result<Vec<String>> {
        let orphans: Vec<String> = self
            .status()?
            .into_iter()
            .filter(|s| s.orphaned)
            .map(|s| s.collection)
            .collect();

        for collection in &orphans {
            self.indexes.remove(collection)?;
            tracing::info!(collection = collection.as_str(), "removed orphaned index");
        }
        Ok(orphans)
    }
}

fn stale_warning(
    collection: &str,
    index: &IndexedCollection,
    current: usize,
) -> Option<StaleIndexWarning> {
    (index.rows() != current).then(|| StaleIndexWarning {
        collection: collection.to_string(),
        indexed: index.rows(),
        current,
    })
}

pub(crate) fn index_error(collection: &str, err: IndexError) -> SearchError {
    match err {
        IndexError::Empty => SearchError::EmptyCollection {
            collection: collection.to_string(),
        },
        IndexError::DimensionMismatch { expected, actual } => SearchError::DimensionMismatch {
            collection: collection.to_string(),
            expected,
            actual,
        },
        IndexError::BadBlob { .. } => SearchError::corrupt(collection, err.to_string()),
    }
}
