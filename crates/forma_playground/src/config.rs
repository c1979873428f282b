//! Configuration lookup
//!
//! An explicit `--config` path wins. Otherwise `forma.toml` next to the
//! scenario, then in the working directory, is used when present.

use anyhow::{Context, Result};
use forma_inputs::FormaConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "forma.toml";

/// Load the configuration for a scenario
pub fn load_config(explicit: Option<&Path>, scenario: &Path) -> Result<FormaConfig> {
    if let Some(path) = explicit {
        return FormaConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()));
    }

    match find_config(scenario) {
        Some(path) => FormaConfig::load(&path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
            Ok(FormaConfig::default())
        }
    }
}

fn find_config(scenario: &Path) -> Option<PathBuf> {
    let beside = scenario
        .parent()
        .map(|dir| dir.join(CONFIG_FILE_NAME));
    beside
        .into_iter()
        .chain(std::iter::once(PathBuf::from(CONFIG_FILE_NAME)))
        .find(|candidate| candidate.is_file())
}
