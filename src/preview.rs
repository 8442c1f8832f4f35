//! Preview Lifecycle Controller
//!
//! Single-flight state machine for the overlay window:
//!
//! ```text
//! Idle -> Creating -> AwaitingReady -> Animating(Open) -> Open
//!                                                          |
//! Idle <- Destroyed <------------- Animating(Close) <------+
//! ```
//!
//! - `trigger` while `Idle` creates a window; while `Open` it closes it;
//!   in any other state it is a no-op. The Idle check and the move to
//!   `Creating` happen in the same synchronous call, so back-to-back
//!   triggers can never produce two windows.
//! - Readiness is awaited with a deadline. When the deadline passes the
//!   controller proceeds as if ready; leaving `AwaitingReady` is what makes
//!   that happen at most once per window.
//! - Every surface callback carries a handle and is ignored unless it names
//!   the window this controller currently owns.
//! - Any surface failure while a window exists destroys it and returns to
//!   `Idle`. Content failures are shown inside the window instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{Config, WindowConfig};
use crate::content::PreviewContentAdapter;
use crate::error::Result;
use crate::logging;
use crate::surface::{ScreenInfo, SurfaceHandle, WindowSurface};
use crate::transitions::{Opacity, Point, Rect, Tween, TweenDirection};

/// Anchor center used when the cursor position cannot be read
pub const FALLBACK_ANCHOR_CENTER: Point = Point { x: 960.0, y: 540.0 };

#[derive(Debug, Clone)]
pub enum PreviewState {
    Idle,
    /// Window creation requested; only observable from inside `trigger`
    Creating,
    AwaitingReady {
        handle: SurfaceHandle,
        path: PathBuf,
        anchor: Rect,
        deadline: Instant,
    },
    Animating {
        handle: SurfaceHandle,
        path: PathBuf,
        tween: Tween,
    },
    Open {
        handle: SurfaceHandle,
        path: PathBuf,
        bounds: Rect,
    },
}

impl PreviewState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Creating => "creating",
            Self::AwaitingReady { .. } => "awaiting_ready",
            Self::Animating { tween, .. } => match tween.direction {
                TweenDirection::Open => "animating_open",
                TweenDirection::Close => "animating_close",
            },
            Self::Open { .. } => "open",
        }
    }

    pub fn handle(&self) -> Option<SurfaceHandle> {
        match self {
            Self::Idle | Self::Creating => None,
            Self::AwaitingReady { handle, .. }
            | Self::Animating { handle, .. }
            | Self::Open { handle, .. } => Some(*handle),
        }
    }
}

impl fmt::Display for PreviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a `trigger` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Opening(SurfaceHandle),
    Closing(SurfaceHandle),
    /// A window is mid-lifecycle; nothing was done
    Ignored,
    /// Window creation failed; back to `Idle`
    Failed,
}

/// Timing and geometry for the overlay
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSettings {
    pub ready_timeout: Duration,
    pub window: WindowConfig,
}

impl PreviewSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ready_timeout: config.get_ready_timeout(),
            window: config.get_window(),
        }
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Collaborators borrowed for the duration of one controller call
pub struct PreviewPorts<'a> {
    pub surface: &'a mut dyn WindowSurface,
    pub screen: &'a dyn ScreenInfo,
    pub content: &'a dyn PreviewContentAdapter,
}

pub struct PreviewLifecycleController {
    state: PreviewState,
    settings: PreviewSettings,
}

impl PreviewLifecycleController {
    pub fn new(settings: PreviewSettings) -> Self {
        Self {
            state: PreviewState::Idle,
            settings,
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PreviewState::Idle)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PreviewState::Open { .. })
    }

    pub fn current_handle(&self) -> Option<SurfaceHandle> {
        self.state.handle()
    }

    /// Frame ticks are needed while waiting for ready or animating
    pub fn wants_frames(&self) -> bool {
        matches!(
            self.state,
            PreviewState::AwaitingReady { .. } | PreviewState::Animating { .. }
        )
    }

    /// Applies to the next window; a live one keeps its geometry
    pub fn set_settings(&mut self, settings: PreviewSettings) {
        self.settings = settings;
    }

    fn transition(&mut self, next: PreviewState) {
        logging::log_preview_transition(
            self.state.name(),
            next.name(),
            next.handle().or(self.state.handle()).map(|h| h.0),
        );
        self.state = next;
    }

    fn anchor_rect(&self, screen: &dyn ScreenInfo) -> Rect {
        let center = screen
            .cursor_position()
            .unwrap_or(FALLBACK_ANCHOR_CENTER);
        let size = self.settings.window.anchor_size;
        Rect::centered_on(center, size, size)
    }

    fn target_rect(&self, screen: &dyn ScreenInfo) -> Rect {
        let area = screen.primary_work_area();
        let width = self.settings.window.width.min(area.width);
        let height = self.settings.window.height.min(area.height);
        Rect::centered_on(area.center(), width, height).rounded()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Open a preview of `path`, or close the open one.
    pub fn trigger(&mut self, path: &Path, now: Instant, ports: &mut PreviewPorts<'_>) -> TriggerOutcome {
        match &self.state {
            PreviewState::Open { handle, .. } => {
                let handle = *handle;
                self.begin_close(now, ports);
                TriggerOutcome::Closing(handle)
            }
            PreviewState::Idle => {
                self.transition(PreviewState::Creating);
                let anchor = self.anchor_rect(ports.screen);
                match ports.surface.create(anchor) {
                    Ok(handle) => {
                        self.transition(PreviewState::AwaitingReady {
                            handle,
                            path: path.to_path_buf(),
                            anchor,
                            deadline: now + self.settings.ready_timeout,
                        });
                        TriggerOutcome::Opening(handle)
                    }
                    Err(e) => {
                        logging::log_error("PREVIEW", &e.to_string(), Some("window creation"));
                        self.transition(PreviewState::Idle);
                        TriggerOutcome::Failed
                    }
                }
            }
            busy => {
                logging::log(
                    "PREVIEW",
                    &format!("Trigger ignored while {}", busy.name()),
                );
                TriggerOutcome::Ignored
            }
        }
    }

    /// Surface reported ready.
    pub fn on_ready(&mut self, handle: SurfaceHandle, now: Instant, ports: &mut PreviewPorts<'_>) {
        match &self.state {
            PreviewState::AwaitingReady { handle: current, .. } if *current == handle => {
                self.reveal(now, ports);
            }
            other => logging::log(
                "PREVIEW",
                &format!("Ignoring ready for {} while {}", handle, other.name()),
            ),
        }
    }

    /// Advance the ready deadline and any running animation.
    pub fn on_tick(&mut self, now: Instant, ports: &mut PreviewPorts<'_>) {
        match &self.state {
            PreviewState::AwaitingReady { handle, deadline, .. } if now >= *deadline => {
                tracing::warn!(
                    event_type = "preview_ready_timeout",
                    handle = handle.0,
                    "Ready signal not received in time, proceeding"
                );
                self.reveal(now, ports);
            }
            PreviewState::Animating {
                handle,
                path,
                tween,
            } => {
                let (handle, path) = (*handle, path.clone());
                let frame = tween.sample(now);
                let direction = tween.direction;
                if let Err(e) = apply_frame(ports.surface, handle, frame.bounds, frame.opacity) {
                    self.fail(handle, &e.to_string(), ports.surface);
                    return;
                }
                if frame.done {
                    self.finish_animation(handle, path, direction, frame.bounds, ports.surface);
                }
            }
            _ => {}
        }
    }

    /// The surface stopped responding; drop it if it is ours.
    pub fn on_unresponsive(&mut self, handle: SurfaceHandle, surface: &mut dyn WindowSurface) {
        if self.current_handle() == Some(handle) {
            self.fail(handle, "window unresponsive", surface);
        } else {
            logging::log("PREVIEW", &format!("Ignoring unresponsive for stale {}", handle));
        }
    }

    /// The user asked the overlay itself to close.
    pub fn on_close_requested(
        &mut self,
        handle: SurfaceHandle,
        now: Instant,
        ports: &mut PreviewPorts<'_>,
    ) {
        match &self.state {
            PreviewState::Open { handle: current, .. } if *current == handle => {
                self.begin_close(now, ports);
            }
            other => logging::log(
                "PREVIEW",
                &format!("Ignoring close request for {} while {}", handle, other.name()),
            ),
        }
    }

    /// Destroy any window unconditionally and return to `Idle`.
    pub fn force_cleanup(&mut self, surface: &mut dyn WindowSurface) {
        if let Some(handle) = self.current_handle() {
            surface.destroy(handle);
        }
        if !self.is_idle() {
            self.transition(PreviewState::Idle);
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn reveal(&mut self, now: Instant, ports: &mut PreviewPorts<'_>) {
        let PreviewState::AwaitingReady {
            handle,
            path,
            anchor,
            ..
        } = &self.state
        else {
            crate::debug_panic!("reveal while {}", self.state.name());
            return;
        };
        let (handle, path, anchor) = (*handle, path.clone(), *anchor);

        let content = ports.content.get_preview(&path);
        let target = self.target_rect(ports.screen);

        let presented = ports
            .surface
            .set_content(handle, &content)
            .and_then(|()| apply_frame(ports.surface, handle, anchor, Opacity::INVISIBLE))
            .and_then(|()| ports.surface.show(handle));
        if let Err(e) = presented {
            self.fail(handle, &e.to_string(), ports.surface);
            return;
        }

        let tween = Tween::open(anchor, target, now, self.settings.window.open_duration());
        self.transition(PreviewState::Animating {
            handle,
            path,
            tween,
        });
    }

    fn begin_close(&mut self, now: Instant, ports: &mut PreviewPorts<'_>) {
        let PreviewState::Open {
            handle,
            path,
            bounds,
        } = &self.state
        else {
            crate::debug_panic!("close while {}", self.state.name());
            return;
        };
        let (handle, path, bounds) = (*handle, path.clone(), *bounds);

        let anchor = self.anchor_rect(ports.screen);
        let tween = Tween::close(bounds, anchor, now, self.settings.window.close_duration());
        self.transition(PreviewState::Animating {
            handle,
            path,
            tween,
        });
    }

    fn finish_animation(
        &mut self,
        handle: SurfaceHandle,
        path: PathBuf,
        direction: TweenDirection,
        bounds: Rect,
        surface: &mut dyn WindowSurface,
    ) {
        match direction {
            TweenDirection::Open => {
                if let Err(e) = surface.focus(handle) {
                    self.fail(handle, &e.to_string(), surface);
                    return;
                }
                self.transition(PreviewState::Open {
                    handle,
                    path,
                    bounds,
                });
            }
            TweenDirection::Close => {
                surface.destroy(handle);
                self.transition(PreviewState::Idle);
            }
        }
    }

    fn fail(&mut self, handle: SurfaceHandle, reason: &str, surface: &mut dyn WindowSurface) {
        logging::log_error("PREVIEW", reason, Some("destroying overlay"));
        surface.destroy(handle);
        self.transition(PreviewState::Idle);
    }
}

fn apply_frame(
    surface: &mut dyn WindowSurface,
    handle: SurfaceHandle,
    bounds: Rect,
    opacity: Opacity,
) -> Result<()> {
    surface.set_bounds(handle, bounds)?;
    surface.set_opacity(handle, opacity.value())
}

#[cfg(test)]
#[path = "preview_tests.rs"]
mod tests;
