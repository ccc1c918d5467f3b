use std::path::{Path, PathBuf};

use super::config::Config;

pub const CONFIG_FILE: &str = "dashsearch.yaml";

pub struct WorkspacePaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub metadata: PathBuf,
    pub index_db: PathBuf,
}

impl WorkspacePaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self::with_config(root, &Config::default())
    }

    /// Relative config paths are resolved against the workspace root.
    pub fn with_config(root: PathBuf, config: &Config) -> Self {
        Self {
            config: root.join(CONFIG_FILE),
            metadata: resolve(&root, &config.metadata_dir),
            index_db: resolve(&root, &config.index_db),
            root,
        }
    }

    pub fn metadata_file(&self, collection: &str) -> PathBuf {
        self.metadata.join(format!("{}.json", collection))
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let paths = WorkspacePaths::from_root(PathBuf::from("/work"));
        assert_eq!(paths.metadata, PathBuf::from("/work/metadata"));
        assert_eq!(paths.index_db, PathBuf::from("/work/.dashsearch/index.db"));
        assert_eq!(
            paths.metadata_file("Sales"),
            PathBuf::from("/work/metadata/Sales.json")
        );
    }

    #[test]
    fn test_absolute_override() {
        let config = Config {
            index_db: PathBuf::from("/var/lib/dashsearch.db"),
            ..Config::default()
        };
        let paths = WorkspacePaths::with_config(PathBuf::from("/work"), &config);
        assert_eq!(paths.index_db, PathBuf::from("/var/lib/dashsearch.db"));
    }
}
