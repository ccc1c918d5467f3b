//! Import command - store extracted dashboard metadata for a workbook

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use dashsearch::core::selector::validate_workbook_name;
use dashsearch::search::MetadataStore;
use dashsearch::{DashboardRecord, WorkspacePaths};

use super::{fail, Workspace};

pub fn run(workspace: &Workspace, workbook: &str, file: &Path, json: bool) -> Result<()> {
    validate_workbook_name(workbook)?;

    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let records: Vec<DashboardRecord> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of dashboard records", file.display()))?;

    let paths = WorkspacePaths::with_config(workspace.root.clone(), &workspace.config);
    let store = MetadataStore::new(&paths.metadata);
    let replaced = store.exists(workbook);

    if let Err(e) = store.save(workbook, &records) {
        fail(&e, json);
    }

    if json {
        println!(
            "{}",
            serde_json::json!({
                "collection": workbook,
                "records": records.len(),
                "replaced": replaced,
                "path": paths.metadata_file(workbook).display().to_string(),
            })
        );
    } else {
        println!(
            "{} {} {} records into {}",
            "✓".green().bold(),
            if replaced { "Replaced with" } else { "Imported" },
            records.len().to_string().cyan(),
            workbook.cyan()
        );
        println!(
            "  {} Run {} to make them searchable",
            "→".dimmed(),
            format!("dashsearch build \"{}\"", workbook).cyan()
        );
    }

    Ok(())
}
