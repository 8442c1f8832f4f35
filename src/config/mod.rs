//! Configuration module - Application settings and user preferences
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.finder-enhance/config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, HotkeyConfig, etc.)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::DEFAULT_CONFIG_PATH;

pub use types::{Config, HotkeyConfig, WindowConfig};

pub use loader::{default_config_path, load_config, load_config_from};

#[cfg(test)]
pub use defaults::{
    DEFAULT_ANCHOR_SIZE, DEFAULT_ARCHIVE_LIST_LIMIT, DEFAULT_HEALTH_CHECK_INTERVAL_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PREVIEW_LIMIT, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_READY_TIMEOUT_MS, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH,
};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
