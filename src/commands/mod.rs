pub mod build;
pub mod collections;
pub mod import;
pub mod prune;
pub mod search;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use dashsearch::core::error::Missing;
use dashsearch::core::paths::CONFIG_FILE;
use dashsearch::{Config, SearchEngine, SearchError};

/// Workspace root plus its config, shared by every command.
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
}

impl Workspace {
    pub fn open(root: Option<PathBuf>) -> Result<Self> {
        let root = match root {
            Some(root) => root,
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let config = Config::load(&root.join(CONFIG_FILE))?;
        Ok(Self { root, config })
    }

    pub fn engine(&self) -> Result<SearchEngine> {
        SearchEngine::open(&self.root, &self.config)
            .with_context(|| format!("Failed to open workspace {}", self.root.display()))
    }
}

/// Print a library error as JSON or as a colored hint, then exit 1.
pub fn fail(err: &SearchError, json: bool) -> ! {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "error": err.code(),
                "message": err.to_string(),
            })
        );
    } else {
        eprintln!("{} {}", "Error:".red().bold(), err);
        if let Some(hint) = hint(err) {
            eprintln!("  {} {}", "→".dimmed(), hint);
        }
    }
    std::process::exit(1);
}

fn hint(err: &SearchError) -> Option<&'static str> {
    match err {
        SearchError::NotFound { kind, .. } => Some(match kind {
            Missing::Metadata => "Run `dashsearch import <workbook> <file>` first",
            Missing::Index => "Run `dashsearch build <collection>` first",
        }),
        SearchError::DimensionMismatch { .. }
        | SearchError::CorruptIndex { .. }
        | SearchError::EmptyCollection { .. } => Some("Fix the metadata if needed, then rebuild the index"),
        _ => None,
    }
}

/// Left-align `text` to `width` terminal columns.
pub fn pad(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    format!("{}{}", text, " ".repeat(width.saturating_sub(used)))
}

/// Char-aware truncation for display
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}
