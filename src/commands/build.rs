//! Build command - (re)build collection indexes

use anyhow::Result;
use colored::Colorize;

use dashsearch::search::BuildReport;
use dashsearch::CollectionSelector;

use super::{fail, Workspace};

pub fn run(
    workspace: &Workspace,
    selector: Option<CollectionSelector>,
    each: bool,
    json: bool,
) -> Result<()> {
    let mut engine = workspace.engine()?;

    if !json {
        println!(
            "{} Building with {} ...",
            "→".dimmed(),
            engine.embedder().name()
        );
    }

    let result = match (&selector, each) {
        (_, true) => engine.rebuild_each(None),
        (Some(selector), false) => engine.rebuild(selector, None).map(|r| vec![r]),
        (None, false) => engine.rebuild(&CollectionSelector::All, None).map(|r| vec![r]),
    };

    let reports = match result {
        Ok(reports) => reports,
        Err(e) => fail(&e, json),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!();
    for report in &reports {
        print_report(report);
    }
    println!(
        "  {} Index saved to: {}",
        "→".dimmed(),
        workspace
            .root
            .join(&workspace.config.index_db)
            .display()
    );

    Ok(())
}

fn print_report(report: &BuildReport) {
    println!(
        "{} {}: indexed {} dashboards ({} dims) in {:.2}s",
        "✓".green().bold(),
        report.collection.cyan(),
        report.rows.to_string().cyan(),
        report.dimension,
        report.duration_ms as f64 / 1000.0
    );
}
