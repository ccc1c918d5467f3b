//! Optional workspace configuration (`dashsearch.yaml`)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::search::index::Metric;

pub const DEFAULT_K: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub metadata_dir: PathBuf,
    pub index_db: PathBuf,
    pub default_k: usize,
    pub batch_size: usize,
    pub metric: Metric,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_dir: PathBuf::from("metadata"),
            index_db: PathBuf::from(".dashsearch/index.db"),
            default_k: DEFAULT_K,
            batch_size: DEFAULT_BATCH_SIZE,
            metric: Metric::L2,
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;

        if config.default_k == 0 {
            anyhow::bail!("default_k must be at least 1");
        }
        if config.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config = Config::parse("default_k: 10\nmetric: inner_product\n").unwrap();
        assert_eq!(config.default_k, 10);
        assert_eq!(config.metric, Metric::InnerProduct);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.metadata_dir, PathBuf::from("metadata"));
    }

    #[test]
    fn test_rejects_zero_k() {
        assert!(Config::parse("default_k: 0").is_err());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(Config::parse("top_k: 3").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/dashsearch.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
