//! Where entity records, the registry, and the compaction archive live.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_registry_path() -> PathBuf {
    PathBuf::from(".brain/registry.json")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from(".brain/archive")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory containing the per-type entity folders.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Registry record location. Relative paths resolve against `root`.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Compaction archive directory. Relative paths resolve against `root`.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            registry_path: default_registry_path(),
            archive_dir: default_archive_dir(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn registry_file(&self) -> PathBuf {
        resolve(&self.root, &self.registry_path)
    }

    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        resolve(&self.root, &self.archive_dir)
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
    fn relative_paths_resolve_against_root() {
        let config = StoreConfig {
            root: PathBuf::from("/srv/brain"),
            ..StoreConfig::default()
        };
        assert_eq!(config.registry_file(), PathBuf::from("/srv/brain/.brain/registry.json"));
        assert_eq!(config.archive_path(), PathBuf::from("/srv/brain/.brain/archive"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let config = StoreConfig {
            registry_path: PathBuf::from("/tmp/registry.json"),
            ..StoreConfig::default()
        };
        assert_eq!(config.registry_file(), PathBuf::from("/tmp/registry.json"));
    }
}
