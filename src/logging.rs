//! Structured JSONL logging for tooling and human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (~/.finder-enhance/logs/finder-enhance.jsonl) - structured for parsing
//! - **Pretty to stderr** - human-readable for developers
//!
//! # Usage
//!
//! ```rust,ignore
//! use finder_enhance::logging;
//!
//! // Initialize logging - MUST keep guard alive for duration of program
//! let _guard = logging::init();
//!
//! tracing::info!(event_type = "app_lifecycle", "Application started");
//! ```
//!
//! # JSONL Output Format
//!
//! ```json
//! {"timestamp":"2025-03-01T10:30:45.123Z","level":"INFO","target":"finder_enhance::arbiter","fields":{"event_type":"hotkey_claim","action":"preview","claimed":true}}
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "finder-enhance.jsonl";

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
/// If the log file cannot be opened, only the stderr layer is installed.
pub fn init() -> LoggingGuard {
    let log_dir = get_log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let log_path = log_dir.join(LOG_FILE_NAME);

    eprintln!("========================================");
    eprintln!("[FINDER-ENHANCE] JSONL log: {}", log_path.display());
    eprintln!("[FINDER-ENHANCE] Pretty logs: stderr");
    eprintln!("========================================");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    let (file_writer, file_guard) = match open_log_writer(&log_path) {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    // A missing writer leaves the layer as None, which is a no-op layer
    let json_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_span_events(FmtSpan::NONE)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        "Application logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Open the JSONL file behind a non-blocking writer.
/// Non-blocking keeps the coordinator thread off disk I/O.
fn open_log_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            None
        }
    }
}

/// Get the log directory path (~/.finder-enhance/logs/)
fn get_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".finder-enhance").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("finder-enhance-logs"))
}

/// Get the path to the JSONL log file
pub fn log_path() -> PathBuf {
    get_log_dir().join(LOG_FILE_NAME)
}

// =============================================================================
// Category logging
// =============================================================================

/// Category-tagged log line.
///
/// Prefer tracing macros directly for structured fields:
/// ```rust,ignore
/// tracing::info!(category = "HOTKEY", action = "cut", "Cut handled");
/// ```
pub fn log(category: &str, message: &str) {
    tracing::info!(category = category, "{}", message);
}

/// Debug-only logging - compiled out in release builds
#[cfg(debug_assertions)]
pub fn log_debug(category: &str, message: &str) {
    tracing::debug!(category = category, "{}", message);
}

#[cfg(not(debug_assertions))]
pub fn log_debug(_category: &str, _message: &str) {}

// =============================================================================
// STRUCTURED LOGGING HELPERS
// =============================================================================

/// Log a context snapshot transition (only called when the value changed)
pub fn log_context_change(finder_active: bool, selection: &str) {
    tracing::info!(
        event_type = "context_change",
        finder_active = finder_active,
        selection = selection,
        "Context changed: finder_active={} selection={}", finder_active, selection
    );
}

/// Log a hotkey claim/unclaim outcome
pub fn log_hotkey_claim(action: &str, shortcut: &str, claimed: bool, reason: &str) {
    let verb = if claimed { "CLAIM" } else { "RELEASE" };
    tracing::info!(
        event_type = "hotkey_claim",
        action = action,
        shortcut = shortcut,
        claimed = claimed,
        reason = reason,
        "{} {} ({})", verb, action, shortcut
    );
}

/// Log a preview lifecycle state transition
pub fn log_preview_transition(from: &str, to: &str, handle: Option<u64>) {
    tracing::debug!(
        event_type = "preview_transition",
        from = from,
        to = to,
        handle = handle,
        "Preview {} -> {}", from, to
    );
}

/// Log a performance metric with structured fields
pub fn log_perf(operation: &str, duration_ms: u64, threshold_ms: u64) {
    let is_slow = duration_ms > threshold_ms;

    if is_slow {
        tracing::warn!(
            event_type = "performance",
            operation = operation,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            is_slow = true,
            "Slow operation: {} took {}ms (threshold: {}ms)", operation, duration_ms, threshold_ms
        );
    } else {
        tracing::trace!(
            event_type = "performance",
            operation = operation,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            is_slow = false,
            "Operation {} completed in {}ms", operation, duration_ms
        );
    }
}

/// Log an error with structured fields and context
pub fn log_error(category: &str, error: &str, context: Option<&str>) {
    let msg = match context {
        Some(ctx) => format!("{}: {} (context: {})", category, error, ctx),
        None => format!("{}: {}", category, error),
    };

    tracing::error!(
        event_type = "error",
        category = category,
        error_message = error,
        context = context,
        "{}", msg
    );
}
