//! Search Engine - combines the embedder with collection indexes

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use super::collection::{index_error, BuildReport, CancelFlag, CollectionManager, CollectionStatus};
use super::embedding::{Embedder, HtpEmbedder};
use super::store::MetadataStore;
use super::vectordb::IndexStore;
use crate::core::config::Config;
use crate::core::error::{Operation, Result, SearchError, StaleIndexWarning};
use crate::core::paths::WorkspacePaths;
use crate::core::record::DashboardRecord;
use crate::core::selector::CollectionSelector;

/// A hydrated hit: the record, its workbook and its raw distance.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub collection: String,
    pub record: DashboardRecord,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub collection: String,
    pub hits: Vec<SearchHit>,
    pub warning: Option<StaleIndexWarning>,
}

/// Search engine combining an embedder and the collection manager
pub struct SearchEngine {
    embedder: Box<dyn Embedder>,
    manager: CollectionManager,
}

impl SearchEngine {
    pub fn new(manager: CollectionManager, embedder: Box<dyn Embedder>) -> Self {
        Self { embedder, manager }
    }

    /// Open the workspace at `root` with the built-in HTP embedder.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        let paths = WorkspacePaths::with_config(root.to_path_buf(), config);
        let manager = CollectionManager::new(
            MetadataStore::new(&paths.metadata),
            IndexStore::open(&paths.index_db)?,
        )
        .with_metric(config.metric)
        .with_batch_size(config.batch_size);

        Ok(Self::new(manager, Box::new(HtpEmbedder::new())))
    }

    pub fn manager(&self) -> &CollectionManager {
        &self.manager
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Top-`k` records of `selector` closest to `query`, ascending distance.
    pub fn search(
        &self,
        selector: &CollectionSelector,
        query: &str,
        k: usize,
    ) -> Result<SearchOutcome> {
        if k == 0 {
            return Err(SearchError::InvalidArgument(
                "k must be at least 1".to_string(),
            ));
        }

        let collection = selector.name();
        let resolved = self.manager.resolve(selector)?;

        let query_embedding =
            self.embedder
                .embed(query)
                .map_err(|source| SearchError::UpstreamEmbedding {
                    collection: collection.to_string(),
                    operation: Operation::Search,
                    source,
                })?;

        let neighbors = resolved
            .index
            .index
            .query(&query_embedding, k)
            .map_err(|e| index_error(collection, e))?;
        tracing::debug!(collection, k, hits = neighbors.len(), "query");

        let by_key: HashMap<(&str, &str), &DashboardRecord> = resolved
            .records
            .iter()
            .map(|s| ((s.collection.as_str(), s.record.id.as_str()), &s.record))
            .collect();

        let mut hits = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let entry = resolved.index.entries.get(neighbor.row).ok_or_else(|| {
                SearchError::corrupt(collection, format!("row {} has no entry", neighbor.row))
            })?;
            let record = by_key
                .get(&(entry.collection.as_str(), entry.id.as_str()))
                .ok_or_else(|| {
                    SearchError::corrupt(
                        collection,
                        format!(
                            "row {} points at missing record '{}' in '{}'",
                            entry.row, entry.id, entry.collection
                        ),
                    )
                })?;

            hits.push(SearchHit {
                collection: entry.collection.clone(),
                record: (*record).clone(),
                distance: neighbor.distance,
            });
        }

        Ok(SearchOutcome {
            collection: collection.to_string(),
            hits,
            warning: resolved.warning,
        })
    }

    pub fn rebuild(
        &mut self,
        selector: &CollectionSelector,
        cancel: Option<&CancelFlag>,
    ) -> Result<BuildReport> {
        self.manager
            .rebuild_index(selector, self.embedder.as_ref(), cancel)
    }

    /// Rebuild every workbook, then `All`.
    pub fn rebuild_each(&mut self, cancel: Option<&CancelFlag>) -> Result<Vec<BuildReport>> {
        let mut reports = Vec::new();
        for selector in self.manager.selectors()? {
            reports.push(self.rebuild(&selector, cancel)?);
        }
        Ok(reports)
    }

    /// Drop indexes of workbooks that no longer have metadata.
    pub fn prune(&mut self) -> Result<Vec<String>> {
        self.manager.prune_orphans()
    }

    pub fn collections(&self) -> Result<Vec<CollectionStatus>> {
        self.manager.status()
    }

    /// Look up one record by workbook and id.
    pub fn get_record(&self, collection: &str, id: &str) -> Result<Option<DashboardRecord>> {
        Ok(self
            .manager
            .metadata()
            .load(collection)?
            .into_iter()
            .find(|r| r.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Missing;
    use crate::search::testing::{ConstantEmbedder, KeywordEmbedder};
    use tempfile::TempDir;

    fn engine(dir: &TempDir, embedder: Box<dyn Embedder>) -> SearchEngine {
        let manager = CollectionManager::new(
            MetadataStore::new(dir.path().join("metadata")),
            IndexStore::open(&dir.path().join("index.db")).unwrap(),
        );
        SearchEngine::new(manager, embedder)
    }

    fn sales_records() -> Vec<DashboardRecord> {
        vec![
            DashboardRecord::new("A", "Regional Revenue", "quarterly revenue by region"),
            DashboardRecord::new("B", "Attrition", "employee attrition"),
            DashboardRecord::new("C", "Churn", "customer churn trends"),
        ]
    }

    fn sales() -> CollectionSelector {
        CollectionSelector::workbook("Sales").unwrap()
    }

    fn ids(outcome: &SearchOutcome) -> Vec<&str> {
        outcome.hits.iter().map(|h| h.record.id.as_str()).collect()
    }

    #[test]
    fn test_sales_scenario() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Box::new(KeywordEmbedder));
        engine
            .manager()
            .metadata()
            .save("Sales", &sales_records())
            .unwrap();
        engine.rebuild(&sales(), None).unwrap();

        let outcome = engine
            .search(&sales(), "revenue performance by region", 1)
            .unwrap();
        assert_eq!(ids(&outcome), vec!["A"]);
        assert!(outcome.warning.is_none());

        let outcome = engine.search(&sales(), "staff turnover", 2).unwrap();
        assert_eq!(ids(&outcome), vec!["B", "C"]);
        assert!(outcome.hits[0].distance < outcome.hits[1].distance);
    }

    #[test]
    fn test_all_scenario() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Box::new(KeywordEmbedder));
        let records = sales_records();
        engine
            .manager()
            .metadata()
            .save("Sales", &records[..2])
            .unwrap();
        engine
            .manager()
            .metadata()
            .save("HR", &records[2..])
            .unwrap();

        let report = engine.rebuild(&CollectionSelector::All, None).unwrap();
        assert_eq!(report.rows, 3);

        let outcome = engine
            .search(&CollectionSelector::All, "customer revenue", 5)
            .unwrap();
        assert_eq!(outcome.hits.len(), 3);
        let mut workbooks: Vec<&str> = outcome.hits.iter().map(|h| h.collection.as_str()).collect();
        workbooks.sort();
        workbooks.dedup();
        assert_eq!(workbooks, vec!["HR", "Sales"]);
    }

    #[test]
    fn test_results_sorted_and_bounded() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Box::new(KeywordEmbedder));
        engine
            .manager()
            .metadata()
            .save("Sales", &sales_records())
            .unwrap();
        engine.rebuild(&sales(), None).unwrap();

        for k in 1..=5 {
            let outcome = engine.search(&sales(), "customer profit", k).unwrap();
            assert_eq!(outcome.hits.len(), k.min(3));
            assert!(outcome
                .hits
                .windows(2)
                .all(|w| w[0].distance <= w[1].distance));
        }
    }

    #[test]
    fn test_self_retrieval_with_htp() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Box::new(HtpEmbedder::new()));
        let records = vec![
            DashboardRecord::new("fin", "Profit Overview", "Profit and discount by segment")
                .with_tags(["finance", "profit"])
                .with_kpi("Profit Ratio", "Current profit margin (-35%)"),
            DashboardRecord::new("ops", "Service Uptime", "Incident response and MTTR")
                .with_tags(["operations"]),
            DashboardRecord::new("mkt", "Campaign Funnel", "Conversion rate per channel")
                .with_tags(["marketing", "conversion"]),
        ];
        engine.manager().metadata().save("Mixed", &records).unwrap();
        let mixed = CollectionSelector::workbook("Mixed").unwrap();
        engine.rebuild(&mixed, None).unwrap();

        for record in &records {
            let outcome = engine.search(&mixed, &record.embedding_text(), 1).unwrap();
            assert_eq!(outcome.hits[0].record.id, record.id);
        }
    }

    #[test]
    fn test_zero_k_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, Box::new(KeywordEmbedder));
        assert!(matches!(
            engine.search(&sales(), "revenue", 0),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_search_before_build() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, Box::new(KeywordEmbedder));
        engine
            .manager()
            .metadata()
            .save("Sales", &sales_records())
            .unwrap();
        assert!(matches!(
            engine.search(&sales(), "revenue", 3),
            Err(SearchError::NotFound {
                kind: Missing::Index,
                ..
            })
        ));
    }

    #[test]
    fn test_dimension_change_requires_rebuild() {
        let dir = TempDir::new().unwrap();
        {
            let mut engine = engine(&dir, Box::new(KeywordEmbedder));
            engine
                .manager()
                .metadata()
                .save("Sales", &sales_records())
                .unwrap();
            engine.rebuild(&sales(), None).unwrap();
        }

        let engine = engine(&dir, Box::new(ConstantEmbedder(16)));
        let err = engine.search(&sales(), "revenue", 1).unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 8,
                actual: 16,
                ..
            }
        ));
    }

    #[test]
    fn test_stale_index_still_searchable() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Box::new(KeywordEmbedder));
        let mut records = sales_records();
        engine.manager().metadata().save("Sales", &records).unwrap();
        engine.rebuild(&sales(), None).unwrap();

        records.push(DashboardRecord::new("D", "Headcount", "workforce by region"));
        engine.manager().metadata().save("Sales", &records).unwrap();

        let outcome = engine.search(&sales(), "headcount", 10).unwrap();
        assert_eq!(outcome.hits.len(), 3);
        assert!(outcome.hits.iter().all(|h| h.record.id != "D"));
        let warning = outcome.warning.unwrap();
        assert_eq!((warning.indexed, warning.current), (3, 4));
    }

    #[test]
    fn test_removed_record_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Box::new(KeywordEmbedder));
        let records = sales_records();
        engine.manager().metadata().save("Sales", &records).unwrap();
        engine.rebuild(&sales(), None).unwrap();

        engine
            .manager()
            .metadata()
            .save("Sales", &records[..2])
            .unwrap();
        let err = engine.search(&sales(), "churn", 3).unwrap_err();
        assert!(matches!(err, SearchError::CorruptIndex { .. }));
    }

    #[test]
    fn test_results_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let before = {
            let mut engine = engine(&dir, Box::new(HtpEmbedder::new()));
            engine
                .manager()
                .metadata()
                .save("Sales", &sales_records())
                .unwrap();
            engine.rebuild(&sales(), None).unwrap();
            engine.search(&sales(), "regional churn", 3).unwrap()
        };

        let engine = engine(&dir, Box::new(HtpEmbedder::new()));
        let after = engine.search(&sales(), "regional churn", 3).unwrap();
        assert_eq!(ids(&before), ids(&after));
        let distances = |o: &SearchOutcome| o.hits.iter().map(|h| h.distance).collect::<Vec<_>>();
        assert_eq!(distances(&before), distances(&after));
    }

    #[test]
    fn test_get_record() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, Box::new(KeywordEmbedder));
        engine
            .manager()
            .metadata()
            .save("Sales", &sales_records())
            .unwrap();
        let record = engine.get_record("Sales", "B").unwrap().unwrap();
        assert_eq!(record.name, "Attrition");
        assert!(engine.get_record("Sales", "Z").unwrap().is_none());
    }

    #[test]
    fn test_get_record_stays_in_metadata_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("secret.json"),
            r#"[{"id": "x", "name": "outside metadata dir", "description": ""}]"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("metadata")).unwrap();
        let engine = engine(&dir, Box::new(KeywordEmbedder));

        let err = engine.get_record("../secret", "x").unwrap_err();
        assert!(matches!(err, SearchError::InvalidName(_)));
    }
}
