//! Coordinator that owns all core state and processes one event at a time.
//!
//! Probe results, hotkey presses, animation ticks, health ticks and surface
//! callbacks all arrive as `AppEvent`s. Nothing here is shared across
//! threads, so every check-then-act sequence runs without interruption.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::arbiter::{should_claim, ArbiterSettings, ClaimInputs, HotkeyArbiter};
use crate::clipboard::ClipboardCoordinator;
use crate::config::Config;
use crate::content::PreviewContentAdapter;
use crate::context::{ApplyOutcome, ContextCache, ContextObservation, ContextSnapshot};
use crate::error::ProbeFailure;
use crate::hotkeys::{shortcut_bindings, HotkeyAction, HotkeyRegistry};
use crate::logging;
use crate::preview::{PreviewLifecycleController, PreviewPorts, PreviewSettings, TriggerOutcome};
use crate::probe::SelectionQuery;
use crate::surface::{ScreenInfo, SurfaceEvent, WindowSurface};

/// Everything that can wake the coordinator
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A probe finished; `issued_at` is when it was started
    ProbeCompleted {
        issued_at: Instant,
        result: Result<ContextObservation, ProbeFailure>,
    },
    HotkeyPressed(HotkeyAction),
    FrameTick,
    HealthTick,
    Surface(SurfaceEvent),
    SettingsChanged(Box<Config>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// OS-facing collaborators
pub struct AppPorts {
    pub registry: Box<dyn HotkeyRegistry>,
    pub selection: Box<dyn SelectionQuery>,
    pub surface: Box<dyn WindowSurface>,
    pub screen: Box<dyn ScreenInfo>,
    pub content: Box<dyn PreviewContentAdapter>,
}

fn preview_ports(ports: &mut AppPorts) -> PreviewPorts<'_> {
    PreviewPorts {
        surface: ports.surface.as_mut(),
        screen: ports.screen.as_ref(),
        content: ports.content.as_ref(),
    }
}

pub struct FinderEnhanceApp {
    config: Config,
    cache: ContextCache,
    arbiter: HotkeyArbiter,
    preview: PreviewLifecycleController,
    clipboard: ClipboardCoordinator,
    ports: AppPorts,
    probe_failures: u32,
}

impl FinderEnhanceApp {
    /// Bind shortcuts and claim whatever is context-independent.
    pub fn new(config: Config, mut ports: AppPorts, now: Instant) -> Self {
        ports.registry.rebind(&shortcut_bindings(&config));
        ports.content.apply_config(&config);
        let mut app = Self {
            arbiter: HotkeyArbiter::new(
                ArbiterSettings::from_config(&config),
                config.get_health_check_interval(),
                now,
            ),
            preview: PreviewLifecycleController::new(PreviewSettings::from_config(&config)),
            cache: ContextCache::new(now),
            clipboard: ClipboardCoordinator::new(),
            config,
            ports,
            probe_failures: 0,
        };
        app.reevaluate(now);
        app
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &ContextSnapshot {
        self.cache.current()
    }

    pub fn arbiter(&self) -> &HotkeyArbiter {
        &self.arbiter
    }

    pub fn preview(&self) -> &PreviewLifecycleController {
        &self.preview
    }

    pub fn clipboard(&self) -> &ClipboardCoordinator {
        &self.clipboard
    }

    /// Whether the frame ticker should keep sending `FrameTick`
    pub fn wants_frames(&self) -> bool {
        self.preview.wants_frames()
    }

    pub fn handle_event(&mut self, event: AppEvent, now: Instant) -> Flow {
        match event {
            AppEvent::ProbeCompleted { issued_at, result } => {
                self.on_probe_completed(issued_at, result, now)
            }
            AppEvent::HotkeyPressed(action) => self.on_hotkey(action, now),
            AppEvent::FrameTick => self.preview.on_tick(now, &mut preview_ports(&mut self.ports)),
            AppEvent::HealthTick => self.on_health_tick(now),
            AppEvent::Surface(event) => self.on_surface_event(event, now),
            AppEvent::SettingsChanged(config) => self.update_settings(*config, now),
            AppEvent::Shutdown => {
                self.shutdown(now);
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn claim_inputs(&self) -> ClaimInputs {
        let snapshot = self.cache.current();
        ClaimInputs {
            finder_active: snapshot.finder_active,
            selection: snapshot.selection.clone(),
            has_cut_files: self.clipboard.has_cut_files(),
        }
    }

    fn reevaluate(&mut self, now: Instant) {
        let inputs = self.claim_inputs();
        self.arbiter
            .evaluate(&inputs, now, self.ports.registry.as_mut());
    }

    // ========================================================================
    // Context
    // ========================================================================

    fn on_probe_completed(
        &mut self,
        issued_at: Instant,
        result: Result<ContextObservation, ProbeFailure>,
        now: Instant,
    ) {
        let observation = match result {
            Ok(observation) => observation,
            Err(failure) => {
                // Keep the last snapshot; an unknown state must not release hotkeys
                self.probe_failures += 1;
                if self.probe_failures == 1 {
                    tracing::warn!(
                        event_type = "probe_failure",
                        error = %failure,
                        "Context probe failed, keeping last snapshot"
                    );
                } else {
                    logging::log_debug(
                        "PROBE",
                        &format!("Probe failure #{}: {}", self.probe_failures, failure),
                    );
                }
                return;
            }
        };
        if self.probe_failures > 0 {
            logging::log(
                "PROBE",
                &format!("Probe recovered after {} failure(s)", self.probe_failures),
            );
            self.probe_failures = 0;
        }

        match self.cache.apply(observation, issued_at) {
            ApplyOutcome::Changed { .. } => {
                let current = self.cache.current();
                logging::log_context_change(current.finder_active, &current.selection.to_string());
                self.reevaluate(now);
            }
            ApplyOutcome::Unchanged => {}
            ApplyOutcome::Stale => logging::log_debug("PROBE", "Discarded stale probe result"),
        }
    }

    // ========================================================================
    // Hotkeys
    // ========================================================================

    /// Run the local behavior of a claimed hotkey.
    pub fn on_hotkey(&mut self, action: HotkeyAction, now: Instant) {
        logging::log("HOTKEY", &format!("{} pressed", action));
        match action {
            HotkeyAction::Preview | HotkeyAction::ForcePreview => self.handle_preview(action, now),
            HotkeyAction::Cut => self.handle_cut(now),
            HotkeyAction::Paste => self.handle_paste(now),
        }
    }

    fn handle_preview(&mut self, action: HotkeyAction, now: Instant) {
        // An overlay in any state owns the key: close it or ignore the press
        if !self.preview.is_idle() {
            self.preview
                .trigger(Path::new(""), now, &mut preview_ports(&mut self.ports));
            return;
        }

        let inputs = self.claim_inputs();
        let allowed = match action {
            HotkeyAction::ForcePreview => inputs.finder_active && !inputs.selection.is_none(),
            _ => should_claim(action, &inputs, self.arbiter.settings()),
        };
        if !allowed {
            logging::log(
                "HOTKEY",
                &format!("{} ignored for selection {}", action, inputs.selection),
            );
            return;
        }

        let Some(path) = self.ports.selection.first_selected_path() else {
            logging::log("HOTKEY", "No selected path to preview");
            return;
        };
        let outcome = self
            .preview
            .trigger(&path, now, &mut preview_ports(&mut self.ports));
        if outcome == TriggerOutcome::Failed {
            logging::log("PREVIEW", "Preview unavailable");
        }
    }

    fn handle_cut(&mut self, now: Instant) {
        let paths: Vec<PathBuf> = match self.ports.selection.selected_paths() {
            Ok(paths) => paths,
            Err(e) => {
                logging::log_error("CLIPBOARD", &e.to_string(), Some("reading selection for cut"));
                return;
            }
        };
        match self.clipboard.cut_files(&paths) {
            Ok(result) => {
                logging::log("CLIPBOARD", &result.message);
                tracing::debug!(paths = ?self.clipboard.cut_files_snapshot(), "Cut set replaced");
            }
            Err(e) => logging::log_error("CLIPBOARD", &e.user_message(), None),
        }
        self.reevaluate(now);
    }

    fn handle_paste(&mut self, now: Instant) {
        let Some(dest) = self.ports.selection.front_folder() else {
            logging::log("CLIPBOARD", "No front folder to paste into");
            return;
        };
        match self.clipboard.paste_files(&dest) {
            Ok(result) => logging::log("CLIPBOARD", &result.message),
            Err(e) => logging::log_error("CLIPBOARD", &e.user_message(), None),
        }
        self.reevaluate(now);
    }

    // ========================================================================
    // Health / surface / settings / shutdown
    // ========================================================================

    fn on_health_tick(&mut self, now: Instant) {
        if !self.arbiter.health_check_due(now) {
            return;
        }
        let inputs = self.claim_inputs();
        let corrected = self
            .arbiter
            .reconcile(&inputs, now, self.ports.registry.as_mut());
        if !corrected.is_empty() {
            logging::log(
                "HOTKEY",
                &format!("Health check corrected {} action(s)", corrected.len()),
            );
        }
    }

    fn on_surface_event(&mut self, event: SurfaceEvent, now: Instant) {
        match event {
            SurfaceEvent::Ready(handle) => {
                self.preview
                    .on_ready(handle, now, &mut preview_ports(&mut self.ports))
            }
            SurfaceEvent::Unresponsive(handle) => {
                self.preview
                    .on_unresponsive(handle, self.ports.surface.as_mut())
            }
            SurfaceEvent::CloseRequested(handle) => {
                self.preview
                    .on_close_requested(handle, now, &mut preview_ports(&mut self.ports))
            }
        }
    }

    /// Apply new settings and immediately re-run the claim decision.
    pub fn update_settings(&mut self, config: Config, now: Instant) {
        let bindings = shortcut_bindings(&config);
        if bindings != shortcut_bindings(&self.config) {
            self.arbiter
                .release_all(now, self.ports.registry.as_mut());
            self.ports.registry.rebind(&bindings);
        }

        if self.config.get_enable_cut_shortcut() && !config.get_enable_cut_shortcut() {
            self.clipboard.clear();
        }

        self.arbiter
            .set_settings(ArbiterSettings::from_config(&config));
        self.preview
            .set_settings(PreviewSettings::from_config(&config));
        self.ports.content.apply_config(&config);
        self.config = config;

        logging::log("CONFIG", "Settings updated");
        self.reevaluate(now);
    }

    /// Destroy the overlay and release every hotkey.
    pub fn shutdown(&mut self, now: Instant) {
        logging::log("APP", "Shutting down");
        self.preview.force_cleanup(self.ports.surface.as_mut());
        self.arbiter
            .release_all(now, self.ports.registry.as_mut());
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
