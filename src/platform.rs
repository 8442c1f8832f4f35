//! Platform integration for the overlay.
//!
//! On macOS this configures the process as an accessory app, reads cursor and
//! screen geometry, and drives the overlay as a non-activating `NSPanel` so
//! Finder stays frontmost while the preview is visible.
//!
//! Everything outside this module works in top-left-origin global
//! coordinates (the CGEvent convention); conversion to AppKit's bottom-left
//! origin happens here via [`flip_y`].
//!
//! On other platforms a headless surface logs each request and reports ready
//! immediately, so the coordinator can run end to end without a window server.

use std::collections::HashMap;

use crate::content::{render_preview_text, PreviewContent};
use crate::error::{FinderEnhanceError, Result};
use crate::logging;
use crate::surface::{ScreenInfo, SurfaceEvent, SurfaceEventSink, SurfaceHandle, WindowSurface};
use crate::transitions::{Point, Rect};

#[cfg(target_os = "macos")]
use cocoa::appkit::NSApp;
#[cfg(target_os = "macos")]
use cocoa::base::{id, nil, NO, YES};
#[cfg(target_os = "macos")]
use cocoa::foundation::{NSPoint, NSRect, NSSize, NSString};
#[cfg(target_os = "macos")]
use objc::{class, msg_send, sel, sel_impl};

// ============================================================================
// Thread Safety
// ============================================================================

/// Assert that the current thread is the main thread.
///
/// AppKit objects are only valid on the main thread; the runtime routes every
/// surface call there. Panics in debug builds when violated.
#[cfg(target_os = "macos")]
fn debug_assert_main_thread() {
    unsafe {
        let is_main: bool = msg_send![class!(NSThread), isMainThread];
        debug_assert!(
            is_main,
            "AppKit calls must run on the main thread, but this was called from a background thread"
        );
    }
}

// ============================================================================
// Application Activation Policy
// ============================================================================

/// Run as an accessory app: no Dock icon and no menu bar ownership.
///
/// Sets NSApplicationActivationPolicyAccessory (1). Call before any
/// overlay is created.
#[cfg(target_os = "macos")]
pub fn configure_as_accessory_app() {
    debug_assert_main_thread();
    unsafe {
        let app: id = NSApp();
        let _: () = msg_send![app, setActivationPolicy: 1i64];
        logging::log("PANEL", "Configured app as accessory (no Dock icon)");
    }
}

#[cfg(not(target_os = "macos"))]
pub fn configure_as_accessory_app() {}

/// Run the AppKit event loop on the main thread until [`stop_event_loop`].
#[cfg(target_os = "macos")]
pub fn run_event_loop() {
    debug_assert_main_thread();
    unsafe {
        let app: id = NSApp();
        let _: () = msg_send![app, run];
    }
}

/// Stop the event loop started by [`run_event_loop`].
///
/// `stop:` only takes effect after the next event, so a dummy
/// application-defined event is posted to wake the loop.
#[cfg(target_os = "macos")]
pub fn stop_event_loop() {
    debug_assert_main_thread();
    unsafe {
        let app: id = NSApp();
        let _: () = msg_send![app, stop: nil];
        // NSEventTypeApplicationDefined
        let event: id = msg_send![
            class!(NSEvent),
            otherEventWithType: 15u64
            location: NSPoint::new(0.0, 0.0)
            modifierFlags: 0u64
            timestamp: 0.0f64
            windowNumber: 0i64
            context: nil
            subtype: 0i16
            data1: 0i64
            data2: 0i64
        ];
        if event != nil {
            let _: () = msg_send![app, postEvent: event atStart: YES];
        }
    }
}

// ============================================================================
// Main-thread dispatch
// ============================================================================

#[cfg(target_os = "macos")]
pub mod gcd {
    use std::ffi::c_void;

    // dispatch_get_main_queue() is a macro over the `_dispatch_main_q` symbol
    #[link(name = "System", kind = "framework")]
    extern "C" {
        fn dispatch_async_f(
            queue: *const c_void,
            context: *mut c_void,
            work: extern "C" fn(*mut c_void),
        );
        #[link_name = "_dispatch_main_q"]
        static DISPATCH_MAIN_QUEUE: c_void;
    }

    /// Run `f` on the main thread via GCD.
    pub fn dispatch_to_main<F: FnOnce() + Send + 'static>(f: F) {
        let boxed: Box<dyn FnOnce() + Send> = Box::new(f);
        let raw = Box::into_raw(Box::new(boxed));

        extern "C" fn trampoline(context: *mut c_void) {
            unsafe {
                let boxed: Box<Box<dyn FnOnce() + Send>> = Box::from_raw(context as *mut _);
                boxed();
            }
        }

        unsafe {
            let main_queue = &DISPATCH_MAIN_QUEUE as *const c_void;
            dispatch_async_f(main_queue, raw as *mut c_void, trampoline);
        }
    }
}

// ============================================================================
// Mouse Position
// ============================================================================

#[cfg(target_os = "macos")]
use core_graphics::event::CGEvent;
#[cfg(target_os = "macos")]
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

/// Global cursor position in top-left-origin screen coordinates.
#[cfg(target_os = "macos")]
pub fn get_global_mouse_position() -> Option<(f64, f64)> {
    let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState).ok()?;
    let event = CGEvent::new(source).ok()?;
    let location = event.location();
    Some((location.x, location.y))
}

#[cfg(not(target_os = "macos"))]
pub fn get_global_mouse_position() -> Option<(f64, f64)> {
    None
}

// ============================================================================
// Display Information
// ============================================================================

/// Work area used when no screen can be queried
pub const FALLBACK_WORK_AREA: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 1920.0,
    height: 1080.0,
};

/// Height of the primary screen, the reference for coordinate flipping.
#[cfg(target_os = "macos")]
pub fn primary_screen_height() -> Option<f64> {
    debug_assert_main_thread();
    unsafe {
        let main_screen: id = msg_send![class!(NSScreen), mainScreen];
        if main_screen == nil {
            return None;
        }
        let frame: NSRect = msg_send![main_screen, frame];
        Some(frame.size.height)
    }
}

#[cfg(not(target_os = "macos"))]
pub fn primary_screen_height() -> Option<f64> {
    Some(FALLBACK_WORK_AREA.height)
}

/// Convert a Y coordinate between top-left and AppKit bottom-left origin.
/// The transform is its own inverse.
pub fn flip_y(primary_height: f64, y: f64, height: f64) -> f64 {
    primary_height - y - height
}

/// Usable area of the primary display (menu bar and Dock excluded),
/// top-left origin.
#[cfg(target_os = "macos")]
pub fn primary_work_area() -> Rect {
    debug_assert_main_thread();
    unsafe {
        let main_screen: id = msg_send![class!(NSScreen), mainScreen];
        if main_screen == nil {
            logging::log("POSITION", "mainScreen returned nil, using fallback work area");
            return FALLBACK_WORK_AREA;
        }
        let frame: NSRect = msg_send![main_screen, frame];
        let visible: NSRect = msg_send![main_screen, visibleFrame];
        Rect::new(
            visible.origin.x,
            flip_y(frame.size.height, visible.origin.y, visible.size.height),
            visible.size.width,
            visible.size.height,
        )
    }
}

#[cfg(not(target_os = "macos"))]
pub fn primary_work_area() -> Rect {
    FALLBACK_WORK_AREA
}

/// Live cursor and screen geometry
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemScreen;

impl ScreenInfo for SystemScreen {
    fn cursor_position(&self) -> Option<Point> {
        get_global_mouse_position().map(|(x, y)| Point::new(x, y))
    }

    fn primary_work_area(&self) -> Rect {
        primary_work_area()
    }
}

// ============================================================================
// Overlay panel (macOS)
// ============================================================================

#[cfg(target_os = "macos")]
mod overlay {
    use super::*;
    use objc::declare::ClassDecl;
    use objc::runtime::{Class, Object, Sel, BOOL};
    use parking_lot::RwLock;
    use std::sync::LazyLock;

    const PANEL_CLASS_NAME: &str = "FinderEnhanceOverlayPanel";
    const HANDLE_IVAR: &str = "feHandle";

    // NSWindowStyleMaskBorderless | NSWindowStyleMaskNonactivatingPanel
    const PANEL_STYLE_MASK: u64 = 1 << 7;
    const NS_BACKING_STORE_BUFFERED: u64 = 2;
    const NS_FLOATING_WINDOW_LEVEL: i64 = 3;
    // CanJoinAllSpaces | FullScreenAuxiliary
    const PANEL_COLLECTION_BEHAVIOR: u64 = (1 << 0) | (1 << 8);
    // NSViewWidthSizable | NSViewHeightSizable
    const FILL_AUTORESIZE: u64 = 2 | 16;

    const KEY_SPACE: u16 = 49;
    const KEY_ESCAPE: u16 = 53;

    /// Receives events raised from inside AppKit callbacks
    static OVERLAY_SINK: LazyLock<RwLock<Option<SurfaceEventSink>>> =
        LazyLock::new(|| RwLock::new(None));

    pub(super) fn install_sink(sink: SurfaceEventSink) {
        *OVERLAY_SINK.write() = Some(sink);
    }

    fn emit(event: SurfaceEvent) {
        if let Some(sink) = OVERLAY_SINK.read().as_ref() {
            sink(event);
        }
    }

    /// NSPanel subclass that can take key focus without activating the app
    /// and turns Space/Escape into close requests.
    pub(super) fn panel_class() -> &'static Class {
        if let Some(existing) = Class::get(PANEL_CLASS_NAME) {
            return existing;
        }

        let mut decl = match ClassDecl::new(PANEL_CLASS_NAME, class!(NSPanel)) {
            Some(d) => d,
            None => return class!(NSPanel),
        };

        extern "C" fn can_become_key(_this: &Object, _sel: Sel) -> BOOL {
            YES
        }

        // Panics must not unwind across the FFI boundary
        extern "C" fn key_down(this: &Object, _sel: Sel, event: id) {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
                let key_code: u16 = msg_send![event, keyCode];
                if key_code == KEY_SPACE || key_code == KEY_ESCAPE {
                    let handle = *this.get_ivar::<u64>(HANDLE_IVAR);
                    emit(SurfaceEvent::CloseRequested(SurfaceHandle(handle)));
                } else {
                    let _: () = msg_send![super(this, class!(NSPanel)), keyDown: event];
                }
            }));
        }

        unsafe {
            decl.add_ivar::<u64>(HANDLE_IVAR);
            decl.add_method(
                sel!(canBecomeKeyWindow),
                can_become_key as extern "C" fn(&Object, Sel) -> BOOL,
            );
            decl.add_method(
                sel!(keyDown:),
                key_down as extern "C" fn(&Object, Sel, id),
            );
        }

        decl.register()
    }

    pub(super) struct Panel {
        pub window: id,
        pub text_view: id,
    }

    /// Build a hidden, transparent panel at `frame` (AppKit coordinates).
    pub(super) unsafe fn build_panel(handle: SurfaceHandle, frame: NSRect) -> Option<Panel> {
        let window: id = msg_send![panel_class(), alloc];
        let window: id = msg_send![
            window,
            initWithContentRect: frame
            styleMask: PANEL_STYLE_MASK
            backing: NS_BACKING_STORE_BUFFERED
            defer: NO
        ];
        if window == nil {
            return None;
        }
        (*window).set_ivar::<u64>(HANDLE_IVAR, handle.0);

        let _: () = msg_send![window, setReleasedWhenClosed: NO];
        let _: () = msg_send![window, setLevel: NS_FLOATING_WINDOW_LEVEL];
        let _: () = msg_send![window, setCollectionBehavior: PANEL_COLLECTION_BEHAVIOR];
        let _: () = msg_send![window, setHidesOnDeactivate: NO];
        let _: () = msg_send![window, setFloatingPanel: YES];
        let _: () = msg_send![window, setOpaque: NO];
        let _: () = msg_send![window, setHasShadow: YES];
        let _: () = msg_send![window, setAlphaValue: 0.0f64];
        let background: id = msg_send![class!(NSColor), windowBackgroundColor];
        let _: () = msg_send![window, setBackgroundColor: background];

        let content_frame = NSRect::new(NSPoint::new(0.0, 0.0), frame.size);
        let scroll: id = msg_send![class!(NSScrollView), alloc];
        let scroll: id = msg_send![scroll, initWithFrame: content_frame];
        let _: () = msg_send![scroll, setHasVerticalScroller: YES];
        let _: () = msg_send![scroll, setAutoresizingMask: FILL_AUTORESIZE];

        let text_view: id = msg_send![class!(NSTextView), alloc];
        let text_view: id = msg_send![text_view, initWithFrame: content_frame];
        let _: () = msg_send![text_view, setEditable: NO];
        let _: () = msg_send![text_view, setSelectable: YES];
        let _: () = msg_send![text_view, setAutoresizingMask: FILL_AUTORESIZE];
        let _: () = msg_send![text_view, setTextContainerInset: NSSize::new(16.0, 16.0)];
        let font: id = msg_send![class!(NSFont), userFixedPitchFontOfSize: 13.0f64];
        if font != nil {
            let _: () = msg_send![text_view, setFont: font];
        }

        let _: () = msg_send![scroll, setDocumentView: text_view];
        let _: () = msg_send![window, setContentView: scroll];
        let _: () = msg_send![text_view, release];
        let _: () = msg_send![scroll, release];

        Some(Panel { window, text_view })
    }
}

/// `WindowSurface` backed by AppKit panels. Main thread only.
#[cfg(target_os = "macos")]
pub struct AppKitSurface {
    next_id: u64,
    panels: HashMap<SurfaceHandle, overlay::Panel>,
    sink: SurfaceEventSink,
}

#[cfg(target_os = "macos")]
impl AppKitSurface {
    pub fn new(sink: SurfaceEventSink) -> Self {
        overlay::install_sink(sink.clone());
        Self {
            next_id: 0,
            panels: HashMap::new(),
            sink,
        }
    }

    fn panel(&self, handle: SurfaceHandle) -> Result<&overlay::Panel> {
        self.panels
            .get(&handle)
            .ok_or(FinderEnhanceError::WindowUnresponsive)
    }

    fn to_appkit(rect: Rect) -> NSRect {
        let primary_height = primary_screen_height().unwrap_or(FALLBACK_WORK_AREA.height);
        NSRect::new(
            NSPoint::new(rect.x, flip_y(primary_height, rect.y, rect.height)),
            NSSize::new(rect.width, rect.height),
        )
    }
}

#[cfg(target_os = "macos")]
impl WindowSurface for AppKitSurface {
    fn create(&mut self, initial: Rect) -> Result<SurfaceHandle> {
        debug_assert_main_thread();
        self.next_id += 1;
        let handle = SurfaceHandle(self.next_id);

        let panel = unsafe { overlay::build_panel(handle, Self::to_appkit(initial)) }
            .ok_or_else(|| FinderEnhanceError::WindowCreation("NSPanel init returned nil".into()))?;
        self.panels.insert(handle, panel);
        logging::log("PANEL", &format!("Created overlay panel {}", handle));

        // The text view is usable as soon as it exists
        (self.sink)(SurfaceEvent::Ready(handle));
        Ok(handle)
    }

    fn set_content(&mut self, handle: SurfaceHandle, content: &PreviewContent) -> Result<()> {
        let panel = self.panel(handle)?;
        let text = render_preview_text(content, chrono::Utc::now());
        unsafe {
            let string: id = NSString::alloc(nil).init_str(&text);
            let _: () = msg_send![panel.text_view, setString: string];
            let _: () = msg_send![string, release];
        }
        Ok(())
    }

    fn set_bounds(&mut self, handle: SurfaceHandle, bounds: Rect) -> Result<()> {
        let panel = self.panel(handle)?;
        let frame = Self::to_appkit(bounds);
        unsafe {
            let _: () = msg_send![panel.window, setFrame: frame display: YES];
        }
        Ok(())
    }

    fn set_opacity(&mut self, handle: SurfaceHandle, opacity: f32) -> Result<()> {
        let panel = self.panel(handle)?;
        unsafe {
            let _: () = msg_send![panel.window, setAlphaValue: opacity as f64];
        }
        Ok(())
    }

    fn show(&mut self, handle: SurfaceHandle) -> Result<()> {
        let panel = self.panel(handle)?;
        unsafe {
            let _: () = msg_send![panel.window, orderFrontRegardless];
        }
        Ok(())
    }

    fn focus(&mut self, handle: SurfaceHandle) -> Result<()> {
        let panel = self.panel(handle)?;
        unsafe {
            let _: () = msg_send![panel.window, makeKeyWindow];
        }
        Ok(())
    }

    fn destroy(&mut self, handle: SurfaceHandle) {
        let Some(panel) = self.panels.remove(&handle) else {
            return;
        };
        unsafe {
            let _: () = msg_send![panel.window, orderOut: nil];
            let _: () = msg_send![panel.window, close];
            let _: () = msg_send![panel.window, release];
        }
        logging::log("PANEL", &format!("Destroyed overlay panel {}", handle));
    }
}

#[cfg(target_os = "macos")]
impl Drop for AppKitSurface {
    fn drop(&mut self) {
        let handles: Vec<SurfaceHandle> = self.panels.keys().copied().collect();
        for handle in handles {
            self.destroy(handle);
        }
    }
}

// ============================================================================
// Headless surface (other platforms)
// ============================================================================

/// Logs every request instead of drawing; reports ready on creation.
#[cfg(not(target_os = "macos"))]
pub struct HeadlessSurface {
    next_id: u64,
    live: HashMap<SurfaceHandle, Rect>,
    sink: SurfaceEventSink,
}

#[cfg(not(target_os = "macos"))]
impl HeadlessSurface {
    pub fn new(sink: SurfaceEventSink) -> Self {
        Self {
            next_id: 0,
            live: HashMap::new(),
            sink,
        }
    }

    fn check(&self, handle: SurfaceHandle) -> Result<()> {
        if self.live.contains_key(&handle) {
            Ok(())
        } else {
            Err(FinderEnhanceError::WindowUnresponsive)
        }
    }
}

#[cfg(not(target_os = "macos"))]
impl WindowSurface for HeadlessSurface {
    fn create(&mut self, initial: Rect) -> Result<SurfaceHandle> {
        self.next_id += 1;
        let handle = SurfaceHandle(self.next_id);
        self.live.insert(handle, initial);
        logging::log("PANEL", &format!("Headless overlay {} at {:?}", handle, initial));
        (self.sink)(SurfaceEvent::Ready(handle));
        Ok(handle)
    }

    fn set_content(&mut self, handle: SurfaceHandle, content: &PreviewContent) -> Result<()> {
        self.check(handle)?;
        logging::log_debug(
            "PANEL",
            &render_preview_text(content, chrono::Utc::now()),
        );
        Ok(())
    }

    fn set_bounds(&mut self, handle: SurfaceHandle, bounds: Rect) -> Result<()> {
        self.check(handle)?;
        self.live.insert(handle, bounds);
        Ok(())
    }

    fn set_opacity(&mut self, handle: SurfaceHandle, _opacity: f32) -> Result<()> {
        self.check(handle)
    }

    fn show(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.check(handle)
    }

    fn focus(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.check(handle)
    }

    fn destroy(&mut self, handle: SurfaceHandle) {
        if self.live.remove(&handle).is_some() {
            logging::log("PANEL", &format!("Headless overlay {} destroyed", handle));
        }
    }
}

/// The overlay surface for this platform
#[cfg(target_os = "macos")]
pub fn create_surface(sink: SurfaceEventSink) -> Box<dyn WindowSurface> {
    Box::new(AppKitSurface::new(sink))
}

#[cfg(not(target_os = "macos"))]
pub fn create_surface(sink: SurfaceEventSink) -> Box<dyn WindowSurface> {
    Box::new(HeadlessSurface::new(sink))
}
