//! In-memory stand-ins for the OS-facing ports, shared by unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clipboard::FileMover;
use crate::config::Config;
use crate::content::{ItemKind, PreviewContent, PreviewContentAdapter, PreviewItem, PreviewKind};
use crate::context::ContextObservation;
use crate::error::{FinderEnhanceError, ProbeFailure, Result};
use crate::hotkeys::{HotkeyAction, HotkeyRegistry};
use crate::probe::{ContextProbe, SelectionQuery};
use crate::surface::{ScreenInfo, SurfaceHandle, WindowSurface};
use crate::transitions::{Point, Rect};

// ============================================================================
// Hotkey registry
// ============================================================================

#[derive(Debug, Default)]
pub struct FakeRegistry {
    pub registered: BTreeSet<HotkeyAction>,
    refused: BTreeSet<HotkeyAction>,
    reject_duplicates: bool,
    attempts: BTreeMap<HotkeyAction, usize>,
    pub register_calls: usize,
    pub unregister_calls: usize,
    pub bindings: Vec<(HotkeyAction, String)>,
}

impl FakeRegistry {
    /// Registering a held action fails, as the macOS backend does
    pub fn rejecting_duplicates() -> Self {
        Self {
            reject_duplicates: true,
            ..Self::default()
        }
    }

    /// Make the OS refuse this action until `allow`
    pub fn refuse(&mut self, action: HotkeyAction) {
        self.refused.insert(action);
    }

    pub fn allow(&mut self, action: HotkeyAction) {
        self.refused.remove(&action);
    }

    /// Simulate an external registration
    pub fn force_registered(&mut self, action: HotkeyAction) {
        self.registered.insert(action);
    }

    /// Simulate an external unregistration
    pub fn force_unregistered(&mut self, action: HotkeyAction) {
        self.registered.remove(&action);
    }

    pub fn register_attempts(&self, action: HotkeyAction) -> usize {
        self.attempts.get(&action).copied().unwrap_or(0)
    }
}

impl HotkeyRegistry for FakeRegistry {
    fn register(&mut self, action: HotkeyAction) -> Result<()> {
        self.register_calls += 1;
        *self.attempts.entry(action).or_default() += 1;
        if self.refused.contains(&action) {
            return Err(FinderEnhanceError::Registration {
                action: action.to_string(),
                reason: "owned by another application".to_string(),
            });
        }
        if !self.registered.insert(action) && self.reject_duplicates {
            return Err(FinderEnhanceError::Registration {
                action: action.to_string(),
                reason: "combo already registered".to_string(),
            });
        }
        Ok(())
    }

    fn unregister(&mut self, action: HotkeyAction) -> Result<()> {
        self.unregister_calls += 1;
        self.registered.remove(&action);
        Ok(())
    }

    fn is_registered(&mut self, action: HotkeyAction) -> bool {
        self.registered.contains(&action)
    }

    fn shortcut_for(&self, action: HotkeyAction) -> String {
        self.bindings
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| action.as_str().to_string())
    }

    fn rebind(&mut self, bindings: &[(HotkeyAction, String)]) {
        self.registered.clear();
        self.bindings = bindings.to_vec();
    }
}

// ============================================================================
// Probe / selection
// ============================================================================

/// Replays scripted replies in order; times out once exhausted
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    replies: VecDeque<std::result::Result<ContextObservation, ProbeFailure>>,
}

impl ScriptedProbe {
    pub fn new(
        replies: impl IntoIterator<Item = std::result::Result<ContextObservation, ProbeFailure>>,
    ) -> Self {
        Self {
            replies: replies.into_iter().collect(),
        }
    }
}

impl ContextProbe for ScriptedProbe {
    fn poll(&mut self) -> std::result::Result<ContextObservation, ProbeFailure> {
        self.replies
            .pop_front()
            .unwrap_or(Err(ProbeFailure::Timeout(300)))
    }
}

#[derive(Debug, Default, Clone)]
pub struct FakeSelection {
    pub paths: Vec<PathBuf>,
    pub front: Option<PathBuf>,
    pub fail: bool,
}

impl FakeSelection {
    pub fn of(paths: &[&Path]) -> Self {
        Self {
            paths: paths.iter().map(|p| p.to_path_buf()).collect(),
            ..Self::default()
        }
    }
}

impl SelectionQuery for FakeSelection {
    fn first_selected_path(&self) -> Option<PathBuf> {
        if self.fail {
            return None;
        }
        self.paths.first().cloned()
    }

    fn selected_paths(&self) -> std::result::Result<Vec<PathBuf>, ProbeFailure> {
        if self.fail {
            return Err(ProbeFailure::ErrorToken("ERROR:".to_string()));
        }
        Ok(self.paths.clone())
    }

    fn front_folder(&self) -> Option<PathBuf> {
        self.front.clone()
    }
}

// ============================================================================
// Window surface / screen
// ============================================================================

#[derive(Debug, Default)]
pub struct FakeSurface {
    next_id: u64,
    pub live: BTreeSet<SurfaceHandle>,
    pub created: Vec<(SurfaceHandle, Rect)>,
    pub destroyed: Vec<SurfaceHandle>,
    pub bounds: HashMap<SurfaceHandle, Rect>,
    pub opacity: HashMap<SurfaceHandle, f32>,
    pub contents: Vec<(SurfaceHandle, PreviewContent)>,
    pub shown: Vec<SurfaceHandle>,
    pub focused: Vec<SurfaceHandle>,
    pub fail_create: bool,
    pub fail_bounds: bool,
}

impl FakeSurface {
    fn check(&self, handle: SurfaceHandle) -> Result<()> {
        if self.live.contains(&handle) {
            Ok(())
        } else {
            Err(FinderEnhanceError::WindowUnresponsive)
        }
    }

    pub fn last_bounds(&self, handle: SurfaceHandle) -> Option<Rect> {
        self.bounds.get(&handle).copied()
    }

    pub fn last_opacity(&self, handle: SurfaceHandle) -> Option<f32> {
        self.opacity.get(&handle).copied()
    }
}

impl WindowSurface for FakeSurface {
    fn create(&mut self, initial: Rect) -> Result<SurfaceHandle> {
        if self.fail_create {
            return Err(FinderEnhanceError::WindowCreation("no window server".to_string()));
        }
        self.next_id += 1;
        let handle = SurfaceHandle(self.next_id);
        self.live.insert(handle);
        self.created.push((handle, initial));
        self.bounds.insert(handle, initial);
        self.opacity.insert(handle, 0.0);
        Ok(handle)
    }

    fn set_content(&mut self, handle: SurfaceHandle, content: &PreviewContent) -> Result<()> {
        self.check(handle)?;
        self.contents.push((handle, content.clone()));
        Ok(())
    }

    fn set_bounds(&mut self, handle: SurfaceHandle, bounds: Rect) -> Result<()> {
        self.check(handle)?;
        if self.fail_bounds {
            return Err(FinderEnhanceError::WindowUnresponsive);
        }
        self.bounds.insert(handle, bounds);
        Ok(())
    }

    fn set_opacity(&mut self, handle: SurfaceHandle, opacity: f32) -> Result<()> {
        self.check(handle)?;
        self.opacity.insert(handle, opacity);
        Ok(())
    }

    fn show(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.check(handle)?;
        self.shown.push(handle);
        Ok(())
    }

    fn focus(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.check(handle)?;
        self.focused.push(handle);
        Ok(())
    }

    fn destroy(&mut self, handle: SurfaceHandle) {
        if self.live.remove(&handle) {
            self.destroyed.push(handle);
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeScreen {
    pub cursor: Option<Point>,
    pub work_area: Rect,
}

impl Default for FakeScreen {
    fn default() -> Self {
        Self {
            cursor: Some(Point::new(200.0, 300.0)),
            work_area: Rect::new(0.0, 25.0, 1920.0, 1050.0),
        }
    }
}

impl ScreenInfo for FakeScreen {
    fn cursor_position(&self) -> Option<Point> {
        self.cursor
    }

    fn primary_work_area(&self) -> Rect {
        self.work_area
    }
}

// ============================================================================
// Content
// ============================================================================

/// Returns a one-item directory listing and records requested paths
#[derive(Debug, Default)]
pub struct RecordingContent {
    pub requests: RefCell<Vec<PathBuf>>,
}

impl RecordingContent {
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl PreviewContentAdapter for RecordingContent {
    fn get_preview(&self, path: &Path) -> PreviewContent {
        self.requests.borrow_mut().push(path.to_path_buf());
        PreviewContent {
            kind: PreviewKind::Directory,
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            items: vec![PreviewItem {
                name: "inner.txt".to_string(),
                kind: ItemKind::File,
                size: Some(1),
                modified_at: None,
                hidden: false,
            }],
            total_items: 1,
            truncated: false,
            message: None,
        }
    }
}

// ============================================================================
// File mover
// ============================================================================

/// Records moves without touching the filesystem
#[derive(Debug, Default, Clone)]
pub struct FakeMover {
    moves: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    fail: bool,
}

impl FakeMover {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn moves(&self) -> Vec<(PathBuf, PathBuf)> {
        self.moves.lock().clone()
    }
}

impl FileMover for FakeMover {
    fn move_entry(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume"));
        }
        self.moves.lock().push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }
}

// ============================================================================
// Shared handles
// ============================================================================

/// Lets a test keep inspecting a fake after handing it to the app as a box
#[derive(Debug, Default)]
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: HotkeyRegistry> HotkeyRegistry for Shared<T> {
    fn register(&mut self, action: HotkeyAction) -> Result<()> {
        self.0.borrow_mut().register(action)
    }

    fn unregister(&mut self, action: HotkeyAction) -> Result<()> {
        self.0.borrow_mut().unregister(action)
    }

    fn is_registered(&mut self, action: HotkeyAction) -> bool {
        self.0.borrow_mut().is_registered(action)
    }

    fn shortcut_for(&self, action: HotkeyAction) -> String {
        self.0.borrow().shortcut_for(action)
    }

    fn rebind(&mut self, bindings: &[(HotkeyAction, String)]) {
        self.0.borrow_mut().rebind(bindings)
    }
}

impl<T: WindowSurface> WindowSurface for Shared<T> {
    fn create(&mut self, initial: Rect) -> Result<SurfaceHandle> {
        self.0.borrow_mut().create(initial)
    }

    fn set_content(&mut self, handle: SurfaceHandle, content: &PreviewContent) -> Result<()> {
        self.0.borrow_mut().set_content(handle, content)
    }

    fn set_bounds(&mut self, handle: SurfaceHandle, bounds: Rect) -> Result<()> {
        self.0.borrow_mut().set_bounds(handle, bounds)
    }

    fn set_opacity(&mut self, handle: SurfaceHandle, opacity: f32) -> Result<()> {
        self.0.borrow_mut().set_opacity(handle, opacity)
    }

    fn show(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.0.borrow_mut().show(handle)
    }

    fn focus(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.0.borrow_mut().focus(handle)
    }

    fn destroy(&mut self, handle: SurfaceHandle) {
        self.0.borrow_mut().destroy(handle)
    }
}

impl<T: SelectionQuery> SelectionQuery for Shared<T> {
    fn first_selected_path(&self) -> Option<PathBuf> {
        self.0.borrow().first_selected_path()
    }

    fn selected_paths(&self) -> std::result::Result<Vec<PathBuf>, ProbeFailure> {
        self.0.borrow().selected_paths()
    }

    fn front_folder(&self) -> Option<PathBuf> {
        self.0.borrow().front_folder()
    }
}

impl<T: ScreenInfo> ScreenInfo for Shared<T> {
    fn cursor_position(&self) -> Option<Point> {
        self.0.borrow().cursor_position()
    }

    fn primary_work_area(&self) -> Rect {
        self.0.borrow().primary_work_area()
    }
}

impl<T: PreviewContentAdapter> PreviewContentAdapter for Shared<T> {
    fn get_preview(&self, path: &Path) -> PreviewContent {
        self.0.borrow().get_preview(path)
    }

    fn apply_config(&mut self, config: &Config) {
        self.0.borrow_mut().apply_config(config)
    }
}
