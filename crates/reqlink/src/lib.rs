//! reqlink library - Requirement traceability checks and language server
//!
//! This library exposes the pieces of the `reqlink` binary for testing
//! and embedding purposes.

pub mod check;
pub mod config;
pub mod lsp;
pub mod policy;
pub mod workspace;

use config::{CONFIG_PATH, Config};
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Walk up from the current directory to the nearest directory holding a
/// reqlink config or a `.git` directory. Falls back to the current directory.
pub fn find_project_root() -> Result<PathBuf> {
    let start = std::env::current_dir().wrap_err("Failed to get current directory")?;
    let mut current = start.clone();

    loop {
        if current.join(CONFIG_PATH).exists() || current.join(".git").exists() {
            return Ok(current);
        }

        if !current.pop() {
            return Ok(start);
        }
    }
}

/// Path of the config file for a project root
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_PATH)
}

/// Load a config file. A missing file is not an error: defaults are used.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

    facet_yaml::from_str(&content)
        .map_err(|e| eyre::eyre!("Failed to parse config file {}: {}", path.display(), e))
}

/// Load config if it is usable, otherwise log why and return defaults.
/// This allows the language server to start with a broken config file.
pub fn load_config_or_default(path: &Path) -> Config {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{:#}", e);
            Config::default()
        }
    }
}
