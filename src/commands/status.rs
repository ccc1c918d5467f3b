//! Status command - per-collection record and index counts

use anyhow::Result;
use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use super::{fail, pad, Workspace};

pub fn run(workspace: &Workspace, json: bool) -> Result<()> {
    let engine = workspace.engine()?;
    let collections = match engine.collections() {
        Ok(collections) => collections,
        Err(e) => fail(&e, json),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "root": workspace.root.display().to_string(),
                "embedder": engine.embedder().name(),
                "metric": workspace.config.metric.as_str(),
                "collections": collections,
            }))?
        );
        return Ok(());
    }

    let width = collections
        .iter()
        .map(|c| UnicodeWidthStr::width(c.collection.as_str()))
        .max()
        .unwrap_or(0)
        .max("Collection".len());

    println!("{}", "Index Status".bold());
    println!();
    println!(
        "  {}  {:>8}  {:>8}  {}",
        pad("Collection", width).dimmed(),
        "Records".dimmed(),
        "Indexed".dimmed(),
        "Built".dimmed()
    );

    let mut stale = 0;
    let mut orphaned = 0;
    for c in &collections {
        let records = c
            .records
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let (indexed, built) = match &c.index {
            Some(i) => (
                i.rows.to_string(),
                i.built_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            None => ("-".to_string(), "never".to_string()),
        };

        let line = format!(
            "  {}  {:>8}  {:>8}  {}",
            pad(&c.collection, width),
            records,
            indexed,
            built
        );
        if c.orphaned {
            orphaned += 1;
            println!("{} {}", line.dimmed(), "(orphaned)".yellow());
        } else if c.stale {
            stale += 1;
            println!("{} {}", line.red(), "(stale)".red());
        } else {
            println!("{}", line);
        }
    }

    if stale > 0 {
        println!();
        println!(
            "{} {} stale index(es). Run {} to refresh.",
            "!".yellow().bold(),
            stale,
            "dashsearch build --each".cyan()
        );
    }
    if orphaned > 0 {
        println!();
        println!(
            "{} {} index(es) without metadata. Run {} to remove them.",
            "!".yellow().bold(),
            orphaned,
            "dashsearch prune".cyan()
        );
    }

    Ok(())
}
