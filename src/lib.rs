#![allow(unexpected_cfgs)]

//! Finder Enhance - Space-bar folder/archive preview and Cmd+X/Cmd+V file
//! moves for macOS Finder.
//!
//! Global hotkeys are claimed only while Finder is frontmost with a suitable
//! selection, so the same keys keep their normal meaning everywhere else.

pub mod config;
pub mod error;
pub mod logging;
pub mod shortcuts;

// Context sampling
pub mod context;
pub mod probe;

// Hotkey ownership
pub mod arbiter;
pub mod hotkeys;

// Features
pub mod clipboard;
pub mod content;

// Overlay lifecycle
pub mod preview;
pub mod surface;
pub mod transitions;

// Process wiring
pub mod app;
pub mod platform;
pub mod runtime;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;
