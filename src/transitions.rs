//! Overlay Transitions
//!
//! Frame-driven tweens for the preview overlay's open and close animations.
//!
//! # Key Components
//!
//! - `Lerp`: linear interpolation between two values of the same type
//! - `Rect`: screen rectangle (points, bottom-left origin on macOS)
//! - `Opacity`: window alpha clamped to 0.0-1.0
//! - `Tween`: samples bounds + opacity at an instant; the last frame is
//!   always the literal target, never an interpolated approximation
//!
//! ```ignore
//! use crate::transitions::{Rect, Tween};
//!
//! let tween = Tween::open(anchor, target, Instant::now(), Duration::from_millis(80));
//! let frame = tween.sample(Instant::now());
//! surface.set_bounds(handle, frame.bounds)?;
//! surface.set_opacity(handle, frame.opacity.value())?;
//! ```
//!
//! # Easing Functions
//!
//! - `linear`: No easing (constant velocity)
//! - `ease_out_cubic`: Fast start, slow end (open)
//! - `ease_in_cubic`: Slow start, fast end (close)

use std::time::{Duration, Instant};

// ============================================================================
// Lerp Trait
// ============================================================================

/// A value which can be linearly interpolated with another value of the same type.
///
/// The `delta` parameter is a value from 0.0 to 1.0 where:
/// - 0.0 returns `self`
/// - 1.0 returns `to`
/// - Values in between return a linear interpolation
pub trait Lerp {
    fn lerp(&self, to: &Self, delta: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, to: &Self, delta: f32) -> Self {
        self + (to - self) * delta
    }
}

impl Lerp for f64 {
    #[inline]
    fn lerp(&self, to: &Self, delta: f32) -> Self {
        self + (to - self) * (delta as f64)
    }
}

// ============================================================================
// Easing Functions
// ============================================================================

/// Linear easing - constant velocity
#[inline]
pub fn linear(t: f32) -> f32 {
    t
}

/// Cubic ease out - fast start, strong deceleration
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Cubic ease in - slow start, strong acceleration
#[inline]
pub fn ease_in_cubic(t: f32) -> f32 {
    t * t * t
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `width × height` centered on `center`
    pub fn centered_on(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Round to whole points; AppKit frames drift when fed fractional values
    pub fn rounded(&self) -> Self {
        Self::new(
            self.x.round(),
            self.y.round(),
            self.width.round(),
            self.height.round(),
        )
    }
}

impl Lerp for Rect {
    fn lerp(&self, to: &Self, delta: f32) -> Self {
        Self {
            x: self.x.lerp(&to.x, delta),
            y: self.y.lerp(&to.y, delta),
            width: self.width.lerp(&to.width, delta),
            height: self.height.lerp(&to.height, delta),
        }
    }
}

// ============================================================================
// Opacity
// ============================================================================

/// Opacity value for fade transitions (0.0 = invisible, 1.0 = fully visible)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Opacity(pub f32);

impl Opacity {
    pub const INVISIBLE: Self = Self(0.0);
    pub const VISIBLE: Self = Self(1.0);

    /// Create a new opacity value, clamped to 0.0-1.0
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Lerp for Opacity {
    fn lerp(&self, to: &Self, delta: f32) -> Self {
        Self::new(self.0 + (to.0 - self.0) * delta)
    }
}

/// Open fade: reaches full opacity a little past the halfway point
pub fn open_opacity(progress: f32) -> Opacity {
    Opacity::new((progress * 1.8).min(1.0))
}

/// Close fade: fully opaque for the first 70%, then linear to zero
pub fn close_opacity(progress: f32) -> Opacity {
    const HOLD: f32 = 0.7;
    if progress < HOLD {
        Opacity::VISIBLE
    } else {
        Opacity::new(1.0 - (progress - HOLD) / (1.0 - HOLD))
    }
}

// ============================================================================
// Tween
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenDirection {
    Open,
    Close,
}

/// One sampled animation frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub bounds: Rect,
    pub opacity: Opacity,
    /// Last frame: bounds are exactly the tween's target
    pub done: bool,
}

/// Bounds/opacity tween between two rectangles over a fixed duration
#[derive(Clone, Copy, Debug)]
pub struct Tween {
    pub direction: TweenDirection,
    pub from: Rect,
    pub to: Rect,
    started_at: Instant,
    duration: Duration,
}

impl Tween {
    pub fn open(from: Rect, to: Rect, started_at: Instant, duration: Duration) -> Self {
        Self {
            direction: TweenDirection::Open,
            from,
            to,
            started_at,
            duration,
        }
    }

    pub fn close(from: Rect, to: Rect, started_at: Instant, duration: Duration) -> Self {
        Self {
            direction: TweenDirection::Close,
            from,
            to,
            started_at,
            duration,
        }
    }

    /// Raw progress 0.0-1.0. A zero duration is complete immediately.
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now: Instant) -> Frame {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return Frame {
                bounds: self.to,
                opacity: match self.direction {
                    TweenDirection::Open => Opacity::VISIBLE,
                    TweenDirection::Close => Opacity::INVISIBLE,
                },
                done: true,
            };
        }

        let (eased, opacity) = match self.direction {
            TweenDirection::Open => (ease_out_cubic(progress), open_opacity(progress)),
            TweenDirection::Close => (ease_in_cubic(progress), close_opacity(progress)),
        };
        Frame {
            bounds: self.from.lerp(&self.to, eased).rounded(),
            opacity,
            done: false,
        }
    }
}
