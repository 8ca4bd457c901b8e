//! Client configuration.
//!
//! `config.json` in the platform config directory holds a [`SyncConfig`];
//! every key is optional.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use murmur_sync::SyncConfig;

pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "murmur").context("Could not determine config directory")
}

fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

/// Load the sync configuration, falling back to defaults when no file exists.
pub fn load() -> Result<SyncConfig> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(SyncConfig::default());
    }

    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: SyncConfig = serde_json::from_str(&json)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}
