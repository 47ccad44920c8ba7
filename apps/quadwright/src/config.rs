//! # Configuration Files
//!
//! Reads a `SessionConfig` from TOML. An explicit `--config` path wins;
//! otherwise `quadwright.toml` in the working directory is used when present,
//! and the built-in defaults when not.

use quadwright_core::{SessionConfig, UpdateError};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "quadwright.toml";

/// Load and validate a config file. An empty file yields the defaults.
pub fn load_config(path: &Path) -> Result<SessionConfig, UpdateError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        UpdateError::Io(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: SessionConfig = if content.trim().is_empty() {
        SessionConfig::default()
    } else {
        toml::from_str(&content).map_err(|e| {
            UpdateError::Serialization(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?
    };

    config.validate()?;
    Ok(config)
}

/// The config file to use, if any.
pub fn find_config(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

/// Resolve the session configuration for this invocation.
pub fn resolve_config(explicit: Option<&Path>) -> Result<SessionConfig, UpdateError> {
    let dir = std::env::current_dir()?;
    match find_config(explicit, &dir) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using config file");
            load_config(&path)
        }
        None => Ok(SessionConfig::default()),
    }
}
