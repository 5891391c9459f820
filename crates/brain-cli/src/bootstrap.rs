use std::path::{Path, PathBuf};

use anyhow::Context;
use brain_config::BrainConfig;

use crate::cli::GlobalFlags;

/// Load configuration for the project at `--root` (or the current
/// directory), after its `.env` file if there is one.
///
/// A relative `store.root` is resolved against the project directory.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<BrainConfig> {
    let project = project_dir(flags.root.as_deref())?;
    load_project_dotenv(&project);

    let mut config = BrainConfig::load_from(&project)
        .with_context(|| format!("failed to load config for {}", project.display()))?;
    if config.store.root.is_relative() {
        config.store.root = project.join(&config.store.root);
    }
    Ok(config)
}

fn project_dir(root: Option<&str>) -> anyhow::Result<PathBuf> {
    match root {
        Some(path) => {
            let explicit = PathBuf::from(path);
            if !explicit.is_dir() {
                anyhow::bail!("invalid --root '{}': directory does not exist", explicit.display());
            }
            Ok(explicit)
        }
        None => std::env::current_dir().context("failed to read current directory"),
    }
}

fn load_project_dotenv(project: &Path) {
    let path = project.join(".env");
    if path.is_file() {
        if let Err(error) = dotenvy::from_path(&path) {
            tracing::warn!(%error, "failed to load {}", path.display());
        }
    }
}
