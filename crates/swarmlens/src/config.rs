//! Configuration file support for swarmlens.
//!
//! Loads `swarmlens.toml` from `--config` or the user config directory and
//! layers it over the built-in [`EngineConfig`] defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use swarmlens_sessions::EngineConfig;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "swarmlens.toml";

/// Settings loaded from `swarmlens.toml`. Every key is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Root of the structured session store
    pub structured_root: Option<String>,
    /// Directory holding structured-session liveness markers
    pub run_dir: Option<String>,
    /// Root of the conversation log store
    pub conversation_root: Option<String>,
    /// How recently a conversation log must be written to count as active
    #[serde(default, with = "humantime_serde")]
    pub active_window: Option<Duration>,
    /// Combined listings longer than this are interleaved by source
    pub interleave_threshold: Option<usize>,
    /// Upper bound on concurrent session loads
    pub max_workers: Option<usize>,
}

impl FileConfig {
    /// Load configuration from an explicit path, or the default location.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if the file exists and parses successfully
    /// - `Ok(None)` if no file exists at the default location
    /// - `Err(...)` if an explicit path is missing or any file fails to parse
    pub fn load(explicit: Option<&Path>) -> Result<Option<Self>> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(None),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(Some(config))
    }

    /// Overlay these settings on `base`.
    pub fn apply(self, mut base: EngineConfig) -> EngineConfig {
        if let Some(root) = self.structured_root {
            base.structured_root = expand_home(&root);
        }
        if let Some(dir) = self.run_dir {
            base.run_dir = expand_home(&dir);
        }
        if let Some(root) = self.conversation_root {
            base.conversation_root = expand_home(&root);
        }
        if let Some(window) = self.active_window {
            base.active_window = window;
        }
        if let Some(threshold) = self.interleave_threshold {
            base.interleave_threshold = threshold;
        }
        if let Some(workers) = self.max_workers {
            base.max_workers = workers.max(1);
        }
        base
    }
}

/// Resolve the engine configuration for this invocation.
pub fn resolve(explicit: Option<&Path>) -> Result<EngineConfig> {
    let base = EngineConfig::default();
    Ok(match FileConfig::load(explicit)? {
        Some(file) => file.apply(base),
        None => base,
    })
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("swarmlens").join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
