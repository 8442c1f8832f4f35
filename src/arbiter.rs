//! Hotkey Arbiter
//!
//! Decides, per logical action, whether this process or the OS consumes the
//! next keystroke. A hotkey is registered with the OS (`Claimed`) exactly
//! while its predicate holds against the latest context, and released
//! (`Unclaimed`) otherwise. An unregistered key is never seen by this
//! process, so nothing has to be intercepted, replayed or guarded against
//! re-entry.
//!
//! The arbiter is evaluated only when something it depends on changes:
//! a new context value, the cut set, or settings. A periodic health check
//! compares local state against the registry's own answer and repairs drift.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::context::SelectionDescriptor;
use crate::error::ResultExt;
use crate::hotkeys::{HotkeyAction, HotkeyRegistry};
use crate::logging;

/// Per-action registration state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// The OS handles the key combination
    Unclaimed,
    /// This process holds the key combination
    Claimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyRegistrationState {
    pub claim: ClaimState,
    pub last_toggle_at: Instant,
}

/// Feature switches that gate the claim predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterSettings {
    pub enable_space_preview: bool,
    /// Gates both cut and paste
    pub enable_cut_shortcut: bool,
}

impl ArbiterSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enable_space_preview: config.get_enable_space_preview(),
            enable_cut_shortcut: config.get_enable_cut_shortcut(),
        }
    }
}

impl Default for ArbiterSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Everything the predicates look at
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimInputs {
    pub finder_active: bool,
    pub selection: SelectionDescriptor,
    pub has_cut_files: bool,
}

/// One registry transition performed during an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimChange {
    Claimed(HotkeyAction),
    Released(HotkeyAction),
    /// The OS refused; the action stays unclaimed until the next evaluation
    Refused(HotkeyAction),
}

/// Whether `action` should be claimed for `inputs` under `settings`
pub fn should_claim(action: HotkeyAction, inputs: &ClaimInputs, settings: ArbiterSettings) -> bool {
    match action {
        HotkeyAction::Preview => {
            settings.enable_space_preview
                && inputs.finder_active
                && inputs.selection.is_previewable()
        }
        HotkeyAction::Cut => {
            settings.enable_cut_shortcut && inputs.finder_active && !inputs.selection.is_none()
        }
        HotkeyAction::Paste => {
            settings.enable_cut_shortcut && inputs.finder_active && inputs.has_cut_files
        }
        HotkeyAction::ForcePreview => settings.enable_space_preview,
    }
}

pub struct HotkeyArbiter {
    states: BTreeMap<HotkeyAction, HotkeyRegistrationState>,
    settings: ArbiterSettings,
    health_interval: Duration,
    last_health_check: Instant,
}

impl HotkeyArbiter {
    /// All actions start unclaimed. `health_interval` is floored by config.
    pub fn new(settings: ArbiterSettings, health_interval: Duration, now: Instant) -> Self {
        let states = HotkeyAction::ALL
            .iter()
            .map(|action| {
                (
                    *action,
                    HotkeyRegistrationState {
                        claim: ClaimState::Unclaimed,
                        last_toggle_at: now,
                    },
                )
            })
            .collect();
        Self {
            states,
            settings,
            health_interval,
            last_health_check: now,
        }
    }

    pub fn settings(&self) -> ArbiterSettings {
        self.settings
    }

    /// Swap feature switches. The caller re-runs `evaluate` afterwards.
    pub fn set_settings(&mut self, settings: ArbiterSettings) {
        self.settings = settings;
    }

    pub fn state(&self, action: HotkeyAction) -> HotkeyRegistrationState {
        self.states
            .get(&action)
            .copied()
            .unwrap_or(HotkeyRegistrationState {
                claim: ClaimState::Unclaimed,
                last_toggle_at: self.last_health_check,
            })
    }

    pub fn is_claimed(&self, action: HotkeyAction) -> bool {
        self.state(action).claim == ClaimState::Claimed
    }

    fn set_claim(&mut self, action: HotkeyAction, claim: ClaimState, now: Instant) {
        if let Some(state) = self.states.get_mut(&action) {
            if state.claim != claim {
                state.claim = claim;
                state.last_toggle_at = now;
            }
        }
    }

    /// Bring every action's registration in line with its predicate.
    ///
    /// Only actions whose desired state differs from the local state touch
    /// the registry. A refused registration leaves the action `Unclaimed`
    /// and is not retried until the next call.
    pub fn evaluate(
        &mut self,
        inputs: &ClaimInputs,
        now: Instant,
        registry: &mut dyn HotkeyRegistry,
    ) -> Vec<ClaimChange> {
        let mut changes = Vec::new();

        for action in HotkeyAction::ALL {
            let want = should_claim(action, inputs, self.settings);
            let have = self.is_claimed(action);
            if want == have {
                continue;
            }

            let shortcut = registry.shortcut_for(action);
            if want {
                match registry.register(action) {
                    Ok(()) => {
                        self.set_claim(action, ClaimState::Claimed, now);
                        logging::log_hotkey_claim(action.as_str(), &shortcut, true, "predicate true");
                        changes.push(ClaimChange::Claimed(action));
                    }
                    Err(e) => {
                        self.set_claim(action, ClaimState::Unclaimed, now);
                        logging::log_error(
                            "HOTKEY",
                            &e.to_string(),
                            Some("registration refused; retrying on next context change"),
                        );
                        changes.push(ClaimChange::Refused(action));
                    }
                }
            } else {
                // Health check re-reads the registry if this really left it held
                registry.unregister(action).warn_on_err();
                self.set_claim(action, ClaimState::Unclaimed, now);
                logging::log_hotkey_claim(action.as_str(), &shortcut, false, "predicate false");
                changes.push(ClaimChange::Released(action));
            }
        }

        changes
    }

    pub fn health_check_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_health_check) >= self.health_interval
    }

    /// Re-read the registry's truth for every action, correct local state
    /// where it disagrees, then re-run the claim decision.
    ///
    /// Returns the actions whose local state was corrected.
    pub fn reconcile(
        &mut self,
        inputs: &ClaimInputs,
        now: Instant,
        registry: &mut dyn HotkeyRegistry,
    ) -> Vec<HotkeyAction> {
        self.last_health_check = now;
        let mut corrected = Vec::new();

        for action in HotkeyAction::ALL {
            let actual = registry.is_registered(action);
            if actual != self.is_claimed(action) {
                tracing::warn!(
                    event_type = "hotkey_drift",
                    action = action.as_str(),
                    registry = actual,
                    "Registry disagrees with local claim state for {}", action
                );
                let claim = if actual {
                    ClaimState::Claimed
                } else {
                    ClaimState::Unclaimed
                };
                self.set_claim(action, claim, now);
                corrected.push(action);
            }
        }

        self.evaluate(inputs, now, registry);
        corrected
    }

    /// Unregister every claimed action (shutdown path). Continues past errors.
    pub fn release_all(&mut self, now: Instant, registry: &mut dyn HotkeyRegistry) {
        for action in HotkeyAction::ALL {
            if !self.is_claimed(action) {
                continue;
            }
            registry.unregister(action).warn_on_err();
            self.set_claim(action, ClaimState::Unclaimed, now);
        }
    }
}
