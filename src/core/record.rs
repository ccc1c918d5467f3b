use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A single KPI shown on a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Searchable dashboard metadata, as produced by the extraction step.
///
/// Field names match the on-disk JSON documents and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub kpis: Vec<KpiEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DashboardRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            kpis: Vec::new(),
            url: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_kpi(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.kpis.push(KpiEntry {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// Text blob fed to the embedder when indexing this record.
    ///
    /// Format: `name - tags - description[ - kpi: desc; kpi: desc]`.
    /// Changing it invalidates every existing index.
    pub fn embedding_text(&self) -> String {
        let mut text = format!(
            "{} - {} - {}",
            self.name,
            self.tags.join(" "),
            self.description
        );

        if !self.kpis.is_empty() {
            let kpis: Vec<String> = self
                .kpis
                .iter()
                .map(|k| format!("{}: {}", k.name, k.description))
                .collect();
            text.push_str(" - ");
            text.push_str(&kpis.join("; "));
        }

        text
    }
}

/// A record tagged with the workbook it came from.
///
/// The `All` view may contain the same `id` under several workbooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedRecord {
    pub collection: String,
    pub record: DashboardRecord,
}

/// Problems that make a record set unfit to store.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordViolation {
    EmptyId(usize),
    DuplicateId(String),
}

impl std::fmt::Display for RecordViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId(pos) => write!(f, "record #{} has an empty id", pos),
            Self::DuplicateId(id) => write!(f, "duplicate record id: {}", id),
        }
    }
}

pub fn validate_records(records: &[DashboardRecord]) -> Vec<RecordViolation> {
    let mut seen = HashSet::new();
    let mut violations = Vec::new();

    for (pos, record) in records.iter().enumerate() {
        if record.id.trim().is_empty() {
            violations.push(RecordViolation::EmptyId(pos));
        } else if !seen.insert(record.id.as_str()) {
            violations.push(RecordViolation::DuplicateId(record.id.clone()));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_includes_kpis() {
        let record = DashboardRecord::new("fin-01", "Profit Overview", "Profit by segment")
            .with_tags(["finance", "profit"])
            .with_kpi("Profit Ratio", "Current profit margin (-35%)")
            .with_kpi("Discount", "Overall discount in dollars (198,837)");

        assert_eq!(
            record.embedding_text(),
            "Profit Overview - finance profit - Profit by segment - \
             Profit Ratio: Current profit margin (-35%); Discount: Overall discount in dollars (198,837)"
        );
    }

    #[test]
    fn test_embedding_text_without_kpis() {
        let record = DashboardRecord::new("a", "Churn", "customer churn trends");
        assert_eq!(record.embedding_text(), "Churn -  - customer churn trends");
    }

    #[test]
    fn test_json_field_names() {
        let json = r#"[{
            "id": "sales-1",
            "name": "Regional Sales",
            "description": "Sales by region",
            "tags": ["sales"],
            "url": "Superstore/Regional.pdf",
            "kpis": [{"name": "Revenue", "description": "Total revenue (1.2M)"}]
        }]"#;

        let records: Vec<DashboardRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].kpis[0].name, "Revenue");
        assert_eq!(records[0].url.as_deref(), Some("Superstore/Regional.pdf"));

        let back = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(back["kpis"][0]["description"], "Total revenue (1.2M)");
        assert_eq!(back["tags"][0], "sales");
    }

    #[test]
    fn test_url_omitted_when_absent() {
        let record = DashboardRecord::new("a", "A", "");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("url").is_none());
    }

    #[test]
    fn test_validate_records() {
        let records = vec![
            DashboardRecord::new("a", "A", ""),
            DashboardRecord::new("", "Blank", ""),
            DashboardRecord::new("a", "Again", ""),
        ];

        let violations = validate_records(&records);
        assert_eq!(
            violations,
            vec![
                RecordViolation::EmptyId(1),
                RecordViolation::DuplicateId("a".to_string()),
            ]
        );
    }
}
