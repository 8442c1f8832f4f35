use thiserror::Error;
use tracing::warn;

/// Error severity for overlay and log display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // transient, already recovered
    Warning,  // recoverable, retried later
    Error,    // operation failed
    Critical, // requires user action
}

/// Why a context probe produced no snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("probe timed out after {0}ms")]
    Timeout(u64),
    #[error("host returned error token '{0}'")]
    ErrorToken(String),
    #[error("malformed probe reply: {0}")]
    Malformed(String),
    #[error("failed to run probe: {0}")]
    Spawn(String),
}

/// Domain-specific errors for Finder Enhance
#[derive(Error, Debug)]
pub enum FinderEnhanceError {
    #[error("Context probe failed: {0}")]
    Probe(#[from] ProbeFailure),

    #[error("Hotkey registration failed for {action}: {reason}")]
    Registration { action: String, reason: String },

    #[error("Preview content unavailable for '{path}': {message}")]
    ContentAdapter { path: String, message: String },

    #[error("Preview window creation failed: {0}")]
    WindowCreation(String),

    #[error("Preview window became unresponsive")]
    WindowUnresponsive,

    #[error("Clipboard operation failed: {0}")]
    Clipboard(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FinderEnhanceError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Probe(_) => ErrorSeverity::Info,
            Self::Registration { .. } => ErrorSeverity::Warning,
            Self::ContentAdapter { .. } => ErrorSeverity::Warning,
            Self::WindowCreation(_) => ErrorSeverity::Error,
            Self::WindowUnresponsive => ErrorSeverity::Error,
            Self::Clipboard(_) => ErrorSeverity::Error,
            Self::Config(_) => ErrorSeverity::Warning,
            Self::Io { .. } => ErrorSeverity::Error,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Probe(_) => "Finder state is temporarily unavailable".to_string(),
            Self::Registration { action, .. } => {
                format!("The {} shortcut is in use by another application", action)
            }
            Self::ContentAdapter { message, .. } => message.clone(),
            Self::WindowCreation(_) | Self::WindowUnresponsive => {
                "Preview unavailable".to_string()
            }
            Self::Clipboard(msg) => msg.clone(),
            Self::Config(msg) => format!("Configuration issue: {}", msg),
            Self::Io { path, .. } => format!("Could not access {}", path),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinderEnhanceError>;

/// Log-and-continue for results nobody upstream can act on.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use finder_enhance::error::ResultExt;
///
/// // Cleanup must continue even if one hotkey refuses to unregister
/// registry.unregister(action).warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

/// Panic in debug mode, log error in release mode.
///
/// Use for "impossible" states that should crash during development
/// but gracefully degrade in production.
///
/// ```ignore
/// debug_panic!("Animation frame for unknown handle {:?}", handle);
/// ```
#[macro_export]
macro_rules! debug_panic {
    ( $($fmt_arg:tt)* ) => {
        if cfg!(debug_assertions) {
            panic!( $($fmt_arg)* );
        } else {
            tracing::error!("IMPOSSIBLE STATE: {}", format_args!($($fmt_arg)*));
        }
    };
}
