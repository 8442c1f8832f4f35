//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Context probe cadence and deadline (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 150;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 300;

/// Hotkey registry reconciliation interval (milliseconds)
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 5000;

/// How long the overlay may stay un-ready before it is forced ready (milliseconds)
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 3000;

/// Default feature flags
pub const DEFAULT_ENABLE_SPACE_PREVIEW: bool = true;
pub const DEFAULT_ENABLE_CUT_SHORTCUT: bool = true;
pub const DEFAULT_SHOW_HIDDEN_FILES: bool = false;

/// Content listing caps
pub const DEFAULT_PREVIEW_LIMIT: usize = 50;
pub const DEFAULT_ARCHIVE_LIST_LIMIT: usize = 100;

/// Overlay window geometry
pub const DEFAULT_WINDOW_WIDTH: f64 = 800.0;
pub const DEFAULT_WINDOW_HEIGHT: f64 = 600.0;
pub const DEFAULT_ANCHOR_SIZE: f64 = 50.0;

/// Overlay animation timing (milliseconds)
pub const DEFAULT_OPEN_DURATION_MS: u64 = 80;
pub const DEFAULT_CLOSE_DURATION_MS: u64 = 80;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 10;

/// Name of the process whose selection is previewed
pub const DEFAULT_TARGET_APP: &str = "Finder";

/// Config file location (tilde-expanded by the loader)
pub const DEFAULT_CONFIG_PATH: &str = "~/.finder-enhance/config.json";
