//! Configuration type definitions
//!
//! This module contains all the struct and enum definitions for configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::*;

// ============================================
// HOTKEY CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub key: String,
}

impl HotkeyConfig {
    /// Bare Space, the Quick Look key
    pub fn default_preview_hotkey() -> Self {
        HotkeyConfig {
            modifiers: vec![],
            key: "Space".to_string(),
        }
    }

    /// Cmd+X
    pub fn default_cut_hotkey() -> Self {
        HotkeyConfig {
            modifiers: vec!["meta".to_string()],
            key: "KeyX".to_string(),
        }
    }

    /// Cmd+V
    pub fn default_paste_hotkey() -> Self {
        HotkeyConfig {
            modifiers: vec!["meta".to_string()],
            key: "KeyV".to_string(),
        }
    }

    /// Cmd+Shift+P, always-on backup for the preview key
    pub fn default_force_preview_hotkey() -> Self {
        HotkeyConfig {
            modifiers: vec!["meta".to_string(), "shift".to_string()],
            key: "KeyP".to_string(),
        }
    }

    /// Convert to canonical shortcut string format (e.g., "cmd+shift+k").
    ///
    /// Maps modifier names from config format to shortcut format:
    /// - "meta" -> "cmd"
    /// - "ctrl" -> "ctrl"
    /// - "alt" -> "alt"
    /// - "shift" -> "shift"
    ///
    /// Keys are normalized:
    /// - "KeyX" -> "x" (strip Key prefix, lowercase)
    /// - "Digit0" -> "0" (strip Digit prefix)
    /// - Other keys kept as-is but lowercased
    pub fn to_shortcut_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        // Consistent order: alt, cmd, ctrl, shift
        let has_alt = self.modifiers.iter().any(|m| m == "alt" || m == "option");
        let has_cmd = self.modifiers.iter().any(|m| m == "meta" || m == "cmd");
        let has_ctrl = self.modifiers.iter().any(|m| m == "ctrl" || m == "control");
        let has_shift = self.modifiers.iter().any(|m| m == "shift");

        if has_alt {
            parts.push("alt".to_string());
        }
        if has_cmd {
            parts.push("cmd".to_string());
        }
        if has_ctrl {
            parts.push("ctrl".to_string());
        }
        if has_shift {
            parts.push("shift".to_string());
        }

        let key = if let Some(rest) = self.key.strip_prefix("Key") {
            rest.to_lowercase()
        } else if let Some(rest) = self.key.strip_prefix("Digit") {
            rest.to_string()
        } else {
            self.key.to_lowercase()
        };
        parts.push(key);

        parts.join("+")
    }
}

// ============================================
// WINDOW CONFIG
// ============================================

/// Geometry and animation timing for the preview overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowConfig {
    /// Overlay width in points (default: 800)
    #[serde(default = "default_window_width")]
    pub width: f64,
    /// Overlay height in points (default: 600)
    #[serde(default = "default_window_height")]
    pub height: f64,
    /// Side of the square the open animation starts from (default: 50)
    #[serde(default = "default_anchor_size")]
    pub anchor_size: f64,
    #[serde(default = "default_open_duration_ms")]
    pub open_duration_ms: u64,
    #[serde(default = "default_close_duration_ms")]
    pub close_duration_ms: u64,
    /// Animation frame cadence (default: 10ms, 8 frames for an 80ms tween)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_window_width() -> f64 {
    DEFAULT_WINDOW_WIDTH
}
fn default_window_height() -> f64 {
    DEFAULT_WINDOW_HEIGHT
}
fn default_anchor_size() -> f64 {
    DEFAULT_ANCHOR_SIZE
}
fn default_open_duration_ms() -> u64 {
    DEFAULT_OPEN_DURATION_MS
}
fn default_close_duration_ms() -> u64 {
    DEFAULT_CLOSE_DURATION_MS
}
fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            anchor_size: DEFAULT_ANCHOR_SIZE,
            open_duration_ms: DEFAULT_OPEN_DURATION_MS,
            close_duration_ms: DEFAULT_CLOSE_DURATION_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl WindowConfig {
    pub fn open_duration(&self) -> Duration {
        Duration::from_millis(self.open_duration_ms)
    }

    pub fn close_duration(&self) -> Duration {
        Duration::from_millis(self.close_duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_hotkey: Option<HotkeyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_hotkey: Option<HotkeyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paste_hotkey: Option<HotkeyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_preview_hotkey: Option<HotkeyConfig>,
    /// Claim the preview key over folders and archives (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_space_preview: Option<bool>,
    /// Claim Cmd+X / Cmd+V for move-style cut and paste (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_cut_shortcut: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_hidden_files: Option<bool>,
    /// Max directory entries shown in the overlay (default: 50)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_limit: Option<usize>,
    /// Max archive entries shown in the overlay (default: 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_list_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowConfig>,
    /// Process name of the file manager being augmented (default: "Finder")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_app: Option<String>,
}

impl Config {
    pub fn get_preview_hotkey(&self) -> HotkeyConfig {
        self.preview_hotkey
            .clone()
            .unwrap_or_else(HotkeyConfig::default_preview_hotkey)
    }

    pub fn get_cut_hotkey(&self) -> HotkeyConfig {
        self.cut_hotkey
            .clone()
            .unwrap_or_else(HotkeyConfig::default_cut_hotkey)
    }

    pub fn get_paste_hotkey(&self) -> HotkeyConfig {
        self.paste_hotkey
            .clone()
            .unwrap_or_else(HotkeyConfig::default_paste_hotkey)
    }

    pub fn get_force_preview_hotkey(&self) -> HotkeyConfig {
        self.force_preview_hotkey
            .clone()
            .unwrap_or_else(HotkeyConfig::default_force_preview_hotkey)
    }

    pub fn get_enable_space_preview(&self) -> bool {
        self.enable_space_preview
            .unwrap_or(DEFAULT_ENABLE_SPACE_PREVIEW)
    }

    pub fn get_enable_cut_shortcut(&self) -> bool {
        self.enable_cut_shortcut.unwrap_or(DEFAULT_ENABLE_CUT_SHORTCUT)
    }

    pub fn get_show_hidden_files(&self) -> bool {
        self.show_hidden_files.unwrap_or(DEFAULT_SHOW_HIDDEN_FILES)
    }

    pub fn get_preview_limit(&self) -> usize {
        self.preview_limit.unwrap_or(DEFAULT_PREVIEW_LIMIT)
    }

    pub fn get_archive_list_limit(&self) -> usize {
        self.archive_list_limit
            .unwrap_or(DEFAULT_ARCHIVE_LIST_LIMIT)
    }

    pub fn get_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    /// Probe deadline, never longer than one poll interval
    pub fn get_probe_timeout(&self) -> Duration {
        let timeout =
            Duration::from_millis(self.probe_timeout_ms.unwrap_or(DEFAULT_PROBE_TIMEOUT_MS));
        timeout.min(Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS))
    }

    /// Reconciliation interval, clamped to at least the default five seconds
    pub fn get_health_check_interval(&self) -> Duration {
        let ms = self
            .health_check_interval_ms
            .unwrap_or(DEFAULT_HEALTH_CHECK_INTERVAL_MS)
            .max(DEFAULT_HEALTH_CHECK_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    pub fn get_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms.unwrap_or(DEFAULT_READY_TIMEOUT_MS))
    }

    pub fn get_window(&self) -> WindowConfig {
        self.window.clone().unwrap_or_default()
    }

    pub fn get_target_app(&self) -> String {
        self.target_app
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGET_APP.to_string())
    }

    /// Fully populated copy, used for `--write-default-config` and `--print-config`
    pub fn resolved(&self) -> Config {
        Config {
            preview_hotkey: Some(self.get_preview_hotkey()),
            cut_hotkey: Some(self.get_cut_hotkey()),
            paste_hotkey: Some(self.get_paste_hotkey()),
            force_preview_hotkey: Some(self.get_force_preview_hotkey()),
            enable_space_preview: Some(self.get_enable_space_preview()),
            enable_cut_shortcut: Some(self.get_enable_cut_shortcut()),
            show_hidden_files: Some(self.get_show_hidden_files()),
            preview_limit: Some(self.get_preview_limit()),
            archive_list_limit: Some(self.get_archive_list_limit()),
            poll_interval_ms: Some(self.get_poll_interval().as_millis() as u64),
            probe_timeout_ms: Some(self.get_probe_timeout().as_millis() as u64),
            health_check_interval_ms: Some(self.get_health_check_interval().as_millis() as u64),
            ready_timeout_ms: Some(self.get_ready_timeout().as_millis() as u64),
            window: Some(self.get_window()),
            target_app: Some(self.get_target_app()),
        }
    }
}
