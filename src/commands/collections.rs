//! Collections command - list selectable collections

use anyhow::Result;
use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use super::{fail, pad, Workspace};

pub fn run(workspace: &Workspace, json: bool) -> Result<()> {
    let engine = workspace.engine()?;
    let collections: Vec<_> = match engine.collections() {
        Ok(collections) => collections.into_iter().filter(|c| !c.orphaned).collect(),
        Err(e) => fail(&e, json),
    };

    if json {
        let names: Vec<_> = collections
            .iter()
            .map(|c| {
                serde_json::json!({
                    "collection": c.collection,
                    "records": c.records,
                    "indexed": c.index.as_ref().map(|i| i.rows),
                    "stale": c.stale,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    let width = collections
        .iter()
        .map(|c| UnicodeWidthStr::width(c.collection.as_str()))
        .max()
        .unwrap_or(0);

    println!("{}", "Collections".bold());
    println!();
    for c in &collections {
        let state = match (&c.index, c.stale) {
            (None, _) => "not built".yellow(),
            (Some(_), true) => "stale".red(),
            (Some(_), false) => "ready".green(),
        };
        println!(
            "  {} {}  {}",
            "→".dimmed(),
            pad(&c.collection, width).cyan(),
            state
        );
    }

    Ok(())
}
