//! Ports between the preview lifecycle and the windowing system.
//!
//! `WindowSurface` calls are synchronous requests; everything the window
//! reports back (ready, unresponsive, close requested) arrives later as a
//! `SurfaceEvent` tagged with the handle it concerns, so a callback for a
//! window that has since been destroyed can be recognised and dropped.

use std::fmt;
use std::sync::Arc;

use crate::content::PreviewContent;
use crate::error::Result;
use crate::transitions::{Point, Rect};

/// Identity of one overlay window. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous notifications from a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The window finished loading and can receive content
    Ready(SurfaceHandle),
    /// The window stopped responding
    Unresponsive(SurfaceHandle),
    /// The user asked the overlay to close (Escape/Space inside it)
    CloseRequested(SurfaceHandle),
}

impl SurfaceEvent {
    pub fn handle(&self) -> SurfaceHandle {
        match self {
            Self::Ready(h) | Self::Unresponsive(h) | Self::CloseRequested(h) => *h,
        }
    }
}

/// Where surfaces deliver their events
pub type SurfaceEventSink = Arc<dyn Fn(SurfaceEvent) + Send + Sync>;

/// The overlay window.
///
/// Every call except `create` names the handle it targets; an unknown
/// handle yields `FinderEnhanceError::WindowUnresponsive`.
pub trait WindowSurface {
    /// Create a hidden, fully transparent window at `initial`.
    /// Readiness is reported later through `SurfaceEvent::Ready`.
    fn create(&mut self, initial: Rect) -> Result<SurfaceHandle>;
    fn set_content(&mut self, handle: SurfaceHandle, content: &PreviewContent) -> Result<()>;
    fn set_bounds(&mut self, handle: SurfaceHandle, bounds: Rect) -> Result<()>;
    fn set_opacity(&mut self, handle: SurfaceHandle, opacity: f32) -> Result<()>;
    /// Order the window front without activating this app
    fn show(&mut self, handle: SurfaceHandle) -> Result<()>;
    fn focus(&mut self, handle: SurfaceHandle) -> Result<()>;
    /// Idempotent; destroying an unknown handle is a no-op
    fn destroy(&mut self, handle: SurfaceHandle);
}

/// Screen geometry, in top-left-origin global coordinates
pub trait ScreenInfo {
    /// Cursor location, if it can be read right now
    fn cursor_position(&self) -> Option<Point>;
    /// Usable area of the primary display (menu bar and Dock excluded)
    fn primary_work_area(&self) -> Rect;
}
