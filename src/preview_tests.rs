use super::*;
use crate::test_support::{FakeScreen, FakeSurface, RecordingContent};

const DOCS: &str = "/Users/me/Docs";

struct Harness {
    controller: PreviewLifecycleController,
    surface: FakeSurface,
    screen: FakeScreen,
    content: RecordingContent,
    t0: Instant,
}

impl Harness {
    fn new() -> Self {
        Self {
            controller: PreviewLifecycleController::new(PreviewSettings::default()),
            surface: FakeSurface::default(),
            screen: FakeScreen::default(),
            content: RecordingContent::default(),
            t0: Instant::now(),
        }
    }

    fn at(&self, ms: u64) -> Instant {
        self.t0 + Duration::from_millis(ms)
    }

    fn trigger(&mut self, ms: u64) -> TriggerOutcome {
        let now = self.at(ms);
        let mut ports = PreviewPorts {
            surface: &mut self.surface,
            screen: &self.screen,
            content: &self.content,
        };
        self.controller.trigger(Path::new(DOCS), now, &mut ports)
    }

    fn ready(&mut self, handle: SurfaceHandle, ms: u64) {
        let now = self.at(ms);
        let mut ports = PreviewPorts {
            surface: &mut self.surface,
            screen: &self.screen,
            content: &self.content,
        };
        self.controller.on_ready(handle, now, &mut ports);
    }

    fn tick(&mut self, ms: u64) {
        let now = self.at(ms);
        let mut ports = PreviewPorts {
            surface: &mut self.surface,
            screen: &self.screen,
            content: &self.content,
        };
        self.controller.on_tick(now, &mut ports);
    }

    fn close_requested(&mut self, handle: SurfaceHandle, ms: u64) {
        let now = self.at(ms);
        let mut ports = PreviewPorts {
            surface: &mut self.surface,
            screen: &self.screen,
            content: &self.content,
        };
        self.controller.on_close_requested(handle, now, &mut ports);
    }

    /// Trigger, signal ready and run the open animation to completion
    fn open(&mut self, start_ms: u64) -> SurfaceHandle {
        let TriggerOutcome::Opening(handle) = self.trigger(start_ms) else {
            panic!("expected Opening");
        };
        self.ready(handle, start_ms + 5);
        for step in 1..=10 {
            self.tick(start_ms + 5 + step * 10);
        }
        assert!(self.controller.is_open(), "state: {}", self.controller.state());
        handle
    }
}

fn target() -> Rect {
    // 800x600 centered in the (0, 25, 1920, 1050) work area
    Rect::new(560.0, 250.0, 800.0, 600.0)
}

fn anchor_at_cursor() -> Rect {
    Rect::new(175.0, 275.0, 50.0, 50.0)
}

// ============================================================================
// Single flight
// ============================================================================

#[test]
fn back_to_back_triggers_create_one_window() {
    let mut h = Harness::new();
    let first = h.trigger(0);
    let second = h.trigger(0);

    assert!(matches!(first, TriggerOutcome::Opening(_)));
    assert_eq!(second, TriggerOutcome::Ignored);
    assert_eq!(h.surface.created.len(), 1);
}

#[test]
fn trigger_is_ignored_while_animating() {
    let mut h = Harness::new();
    let TriggerOutcome::Opening(handle) = h.trigger(0) else {
        panic!("expected Opening");
    };
    h.ready(handle, 5);
    assert_eq!(h.controller.state().name(), "animating_open");

    assert_eq!(h.trigger(10), TriggerOutcome::Ignored);
    assert_eq!(h.controller.state().name(), "animating_open");
    assert_eq!(h.surface.created.len(), 1);
}

#[test]
fn window_is_created_at_cursor_anchor() {
    let mut h = Harness::new();
    h.trigger(0);
    assert_eq!(h.surface.created[0].1, anchor_at_cursor());
    assert!(h.controller.wants_frames());
}

// ============================================================================
// Ready handling
// ============================================================================

#[test]
fn ready_loads_content_and_starts_open_animation() {
    let mut h = Harness::new();
    let TriggerOutcome::Opening(handle) = h.trigger(0) else {
        panic!("expected Opening");
    };
    h.ready(handle, 5);

    assert_eq!(h.content.request_count(), 1);
    assert_eq!(h.content.requests.borrow()[0], Path::new(DOCS));
    assert_eq!(h.surface.contents.len(), 1);
    assert_eq!(h.surface.shown, vec![handle]);
    assert_eq!(h.surface.last_opacity(handle), Some(0.0));
}

#[test]
fn missing_ready_is_forced_exactly_once() {
    let mut h = Harness::new();
    let TriggerOutcome::Opening(handle) = h.trigger(0) else {
        panic!("expected Opening");
    };

    h.tick(2_999);
    assert_eq!(h.controller.state().name(), "awaiting_ready");
    assert_eq!(h.content.request_count(), 0);

    h.tick(3_000);
    assert_eq!(h.content.request_count(), 1);
    assert_eq!(h.surface.shown, vec![handle]);

    // Later ticks and a late ready signal do not reveal again
    h.tick(3_010);
    h.tick(6_000);
    h.ready(handle, 6_001);
    assert_eq!(h.content.request_count(), 1);
    assert_eq!(h.surface.shown.len(), 1);
}

#[test]
fn ready_for_other_handle_is_ignored() {
    let mut h = Harness::new();
    h.trigger(0);
    h.ready(SurfaceHandle(99), 5);

    assert_eq!(h.controller.state().name(), "awaiting_ready");
    assert_eq!(h.content.request_count(), 0);
}

// ============================================================================
// Animation
// ============================================================================

#[test]
fn open_animation_ends_on_exact_target() {
    let mut h = Harness::new();
    let handle = h.open(0);

    assert_eq!(h.surface.last_bounds(handle), Some(target()));
    assert_eq!(h.surface.last_opacity(handle), Some(1.0));
    assert_eq!(h.surface.focused, vec![handle]);
    assert!(!h.controller.wants_frames());
}

#[test]
fn open_then_close_round_trip_resets_to_idle() {
    let mut h = Harness::new();
    let first = h.open(0);

    assert_eq!(h.trigger(200), TriggerOutcome::Closing(first));
    assert_eq!(h.controller.state().name(), "animating_close");

    h.tick(240);
    assert_eq!(h.surface.last_opacity(first), Some(1.0));
    h.tick(290);

    assert!(h.controller.is_idle());
    assert_eq!(h.surface.destroyed, vec![first]);
    assert_eq!(h.surface.last_bounds(first), Some(anchor_at_cursor()));
    assert_eq!(h.surface.last_opacity(first), Some(0.0));

    // A second cycle behaves like the first
    let TriggerOutcome::Opening(second) = h.trigger(400) else {
        panic!("expected Opening");
    };
    assert_ne!(second, first);
    assert_eq!(h.surface.created[1].1, h.surface.created[0].1);
    assert_eq!(h.controller.state().name(), "awaiting_ready");
}

#[test]
fn close_anchor_falls_back_when_cursor_unavailable() {
    let mut h = Harness::new();
    let handle = h.open(0);
    h.screen.cursor = None;

    h.trigger(200);
    h.tick(300);

    assert!(h.controller.is_idle());
    assert_eq!(
        h.surface.last_bounds(handle),
        Some(Rect::centered_on(FALLBACK_ANCHOR_CENTER, 50.0, 50.0))
    );
}

#[test]
fn close_request_from_surface_runs_close_animation() {
    let mut h = Harness::new();
    let handle = h.open(0);

    h.close_requested(SurfaceHandle(42), 150);
    assert!(h.controller.is_open());

    h.close_requested(handle, 150);
    assert_eq!(h.controller.state().name(), "animating_close");
    h.tick(250);
    assert!(h.controller.is_idle());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn creation_failure_returns_to_idle() {
    let mut h = Harness::new();
    h.surface.fail_create = true;

    assert_eq!(h.trigger(0), TriggerOutcome::Failed);
    assert!(h.controller.is_idle());

    h.surface.fail_create = false;
    assert!(matches!(h.trigger(10), TriggerOutcome::Opening(_)));
}

#[test]
fn unresponsive_window_is_destroyed() {
    let mut h = Harness::new();
    let handle = h.open(0);

    h.controller.on_unresponsive(SurfaceHandle(7), &mut h.surface);
    assert!(h.controller.is_open());

    h.controller.on_unresponsive(handle, &mut h.surface);
    assert!(h.controller.is_idle());
    assert_eq!(h.surface.destroyed, vec![handle]);
}

#[test]
fn surface_error_mid_animation_destroys_and_resets() {
    let mut h = Harness::new();
    let TriggerOutcome::Opening(handle) = h.trigger(0) else {
        panic!("expected Opening");
    };
    h.ready(handle, 5);
    h.surface.fail_bounds = true;
    h.tick(20);

    assert!(h.controller.is_idle());
    assert_eq!(h.surface.destroyed, vec![handle]);
}

#[test]
fn force_cleanup_interrupts_any_state() {
    let mut h = Harness::new();
    let TriggerOutcome::Opening(handle) = h.trigger(0) else {
        panic!("expected Opening");
    };
    h.ready(handle, 5);
    h.tick(20);

    h.controller.force_cleanup(&mut h.surface);
    assert!(h.controller.is_idle());
    assert!(h.surface.live.is_empty());

    // Idempotent
    h.controller.force_cleanup(&mut h.surface);
    assert_eq!(h.surface.destroyed, vec![handle]);
}
