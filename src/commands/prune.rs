//! Prune command - drop indexes of deleted workbooks

use anyhow::Result;
use colored::Colorize;

use super::{fail, Workspace};

pub fn run(workspace: &Workspace, json: bool) -> Result<()> {
    let mut engine = workspace.engine()?;
    let removed = match engine.prune() {
        Ok(removed) => removed,
        Err(e) => fail(&e, json),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "removed": removed }))?
        );
        return Ok(());
    }

    if removed.is_empty() {
        println!("{} No orphaned indexes", "✓".green().bold());
        return Ok(());
    }

    for collection in &removed {
        println!("{} Removed index: {}", "✓".green().bold(), collection.cyan());
    }

    Ok(())
}
