//! Configuration loading from file system
//!
//! Reads `config.json` with serde_json. Every failure degrades to defaults.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::DEFAULT_CONFIG_PATH;
use super::types::Config;
use crate::error::{FinderEnhanceError, Result};

/// Default config location with `~` expanded
pub fn default_config_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref())
}

/// Load configuration from ~/.finder-enhance/config.json
///
/// Returns Config::default() if the file is missing or unparseable.
pub fn load_config() -> Config {
    load_config_from(&default_config_path())
}

/// Load configuration from an explicit path, falling back to defaults.
#[instrument(name = "load_config")]
pub fn load_config_from(config_path: &Path) -> Config {
    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return Config::default();
    }

    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to read config file, using defaults"
            );
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&contents) {
        Ok(config) => {
            info!(path = %config_path.display(), "Successfully loaded config");
            config
        }
        Err(e) => {
            let error_hint = if e.to_string().contains("missing field `key`") {
                "\n\nHint: every hotkey needs a 'key' (and optional 'modifiers'). Example:\n\
                \"cutHotkey\": { \"modifiers\": [\"meta\"], \"key\": \"KeyX\" }"
            } else {
                ""
            };

            warn!(
                error = %e,
                path = %config_path.display(),
                hint = %error_hint,
                "Failed to parse config JSON, using defaults"
            );
            Config::default()
        }
    }
}

impl Config {
    /// Write this config as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| FinderEnhanceError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FinderEnhanceError::Config(e.to_string()))?;
        fs::write(path, json).map_err(|source| FinderEnhanceError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
