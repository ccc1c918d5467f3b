//! Search command - semantic dashboard search

use anyhow::Result;
use colored::Colorize;

use dashsearch::CollectionSelector;

use super::{fail, truncate, Workspace};

pub fn run(
    workspace: &Workspace,
    selector: &CollectionSelector,
    query: &str,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let k = k.unwrap_or(workspace.config.default_k);
    let engine = workspace.engine()?;

    let outcome = match engine.search(selector, query, k) {
        Ok(outcome) => outcome,
        Err(e) => fail(&e, json),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if let Some(warning) = &outcome.warning {
        println!("{} {}", "!".yellow().bold(), warning);
        println!();
    }

    if outcome.hits.is_empty() {
        println!("{} No results found for: {}", "→".dimmed(), query.cyan());
        return Ok(());
    }

    println!(
        "{} {} results in {} for: {}",
        "→".dimmed(),
        outcome.hits.len(),
        outcome.collection.cyan(),
        query.cyan()
    );
    println!();

    for (i, hit) in outcome.hits.iter().enumerate() {
        let record = &hit.record;
        let title = match record.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => format!("{} ({})", record.name, url),
            None => record.name.clone(),
        };

        println!(
            "{}. [{}] {}",
            (i + 1).to_string().bold(),
            format!("{:.4}", hit.distance).dimmed(),
            title.cyan()
        );

        if !record.description.is_empty() {
            println!("   {}", truncate(&record.description, 100).dimmed());
        }
        if !record.tags.is_empty() {
            println!("   Tags: {}", record.tags.join(", "));
        }
        if selector.is_all() {
            println!("   Workbook: {}", hit.collection);
        }
        println!();
    }

    Ok(())
}
