//! Metadata store: one JSON document per workbook

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::core::error::{Missing, Result, SearchError};
use crate::core::record::{validate_records, DashboardRecord, ScopedRecord};
use crate::core::selector::validate_workbook_name;

pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Document path for a workbook. The name is validated first, so a
    /// collection argument can never address a file outside `dir`.
    fn path(&self, collection: &str) -> Result<PathBuf> {
        validate_workbook_name(collection)?;
        Ok(self.dir.join(format!("{}.json", collection)))
    }

    pub fn exists(&self, collection: &str) -> bool {
        self.path(collection).is_ok_and(|p| p.is_file())
    }

    pub fn load(&self, collection: &str) -> Result<Vec<DashboardRecord>> {
        let path = self.path(collection)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SearchError::not_found(collection, Missing::Metadata));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| SearchError::InvalidMetadata {
            collection: collection.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the whole document for `collection`.
    ///
    /// Written to a sibling temp file and renamed into place, so readers
    /// never see a half-written document.
    pub fn save(&self, collection: &str, records: &[DashboardRecord]) -> Result<()> {
        let path = self.path(collection)?;

        let violations = validate_records(records);
        if !violations.is_empty() {
            let reasons: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
            return Err(SearchError::InvalidMetadata {
                collection: collection.to_string(),
                reason: reasons.join(", "),
            });
        }

        fs::create_dir_all(&self.dir)?;

        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        tracing::info!(collection, records = records.len(), "saved metadata");
        Ok(())
    }

    /// Workbook names with a metadata document, sorted.
    pub fn list_collections(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let escaped = glob::Pattern::escape(&self.dir.to_string_lossy());
        let pattern = format!("{}/*.json", escaped);
        let entries = glob::glob(&pattern)
            .map_err(|e| SearchError::InvalidArgument(format!("bad metadata dir: {}", e)))?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|p| p.is_file())
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|name| validate_workbook_name(name).is_ok())
            .collect();

        names.sort();
        Ok(names)
    }

    /// Every workbook's records, by workbook name then record order.
    pub fn aggregate(&self) -> Result<Vec<ScopedRecord>> {
        let mut all = Vec::new();

        for collection in self.list_collections()? {
            for record in self.load(&collection)? {
                all.push(ScopedRecord {
                    collection: collection.clone(),
                    record,
                });
            }
        }

        Ok(all)
    }
}
