use global_hotkey::{hotkey::HotKey, Error as HotkeyError, GlobalHotKeyManager};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use crate::config::Config;
use crate::error::{FinderEnhanceError, Result, ResultExt};
use crate::{logging, shortcuts};

// =============================================================================
// Logical actions
// =============================================================================

/// The fixed set of hotkeys this app may claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HotkeyAction {
    /// Toggle the overlay for the selected folder/archive (Space)
    Preview,
    /// Record the selection as cut (Cmd+X)
    Cut,
    /// Move cut files into the front window's folder (Cmd+V)
    Paste,
    /// Backup preview key that does not depend on selection kind (Cmd+Shift+P)
    ForcePreview,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 4] = [
        HotkeyAction::Preview,
        HotkeyAction::Cut,
        HotkeyAction::Paste,
        HotkeyAction::ForcePreview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HotkeyAction::Preview => "preview",
            HotkeyAction::Cut => "cut",
            HotkeyAction::Paste => "paste",
            HotkeyAction::ForcePreview => "force_preview",
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical shortcut strings for every action, from config
pub fn shortcut_bindings(config: &Config) -> Vec<(HotkeyAction, String)> {
    HotkeyAction::ALL
        .iter()
        .map(|action| {
            let hotkey = match action {
                HotkeyAction::Preview => config.get_preview_hotkey(),
                HotkeyAction::Cut => config.get_cut_hotkey(),
                HotkeyAction::Paste => config.get_paste_hotkey(),
                HotkeyAction::ForcePreview => config.get_force_preview_hotkey(),
            };
            (*action, hotkey.to_shortcut_string())
        })
        .collect()
}

// =============================================================================
// Registry port
// =============================================================================

/// OS-level global hotkey registry, keyed by logical action.
pub trait HotkeyRegistry {
    /// Claim the action's key combination. Err means the OS refused.
    fn register(&mut self, action: HotkeyAction) -> Result<()>;
    /// Release the action's key combination. Releasing an unclaimed action is a no-op.
    fn unregister(&mut self, action: HotkeyAction) -> Result<()>;
    /// Whether the OS currently holds the action's combo for this process
    fn is_registered(&mut self, action: HotkeyAction) -> bool;
    /// Display form for logs
    fn shortcut_for(&self, action: HotkeyAction) -> String;
    /// Replace key combinations. Held actions are released first; the
    /// arbiter re-claims them on its next evaluation.
    fn rebind(&mut self, bindings: &[(HotkeyAction, String)]);
}

// =============================================================================
// Hotkey id lookup (read by the listener thread)
// =============================================================================

/// Maps hotkey ID -> action. Written on (re)binding, read per key press.
static HOTKEY_ACTIONS: LazyLock<RwLock<HashMap<u32, HotkeyAction>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Resolve a pressed hotkey id to the action it is bound to.
pub fn action_for_hotkey_id(id: u32) -> Option<HotkeyAction> {
    HOTKEY_ACTIONS.read().get(&id).copied()
}

/// Format a hotkey registration error with helpful context
fn format_hotkey_error(e: &HotkeyError, shortcut_display: &str) -> String {
    match e {
        HotkeyError::AlreadyRegistered(hk) => {
            format!(
                "Hotkey '{}' is already registered (ID: {}).",
                shortcut_display,
                hk.id()
            )
        }
        HotkeyError::FailedToRegister(msg) => {
            format!(
                "System rejected hotkey '{}': {}. Another application may own this shortcut.",
                shortcut_display, msg
            )
        }
        HotkeyError::OsError(os_err) => {
            format!(
                "OS error registering '{}': {}. Check system hotkey settings.",
                shortcut_display, os_err
            )
        }
        other => format!(
            "Failed to register hotkey '{}': {}",
            shortcut_display, other
        ),
    }
}

// =============================================================================
// global_hotkey-backed registry
// =============================================================================

/// The OS calls the registry makes. `GlobalHotKeyManager` in production.
pub trait HotkeyBackend {
    fn register(&self, hotkey: HotKey) -> std::result::Result<(), HotkeyError>;
    fn unregister(&self, hotkey: HotKey) -> std::result::Result<(), HotkeyError>;
}

impl HotkeyBackend for GlobalHotKeyManager {
    fn register(&self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        GlobalHotKeyManager::register(self, hotkey)
    }

    fn unregister(&self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        GlobalHotKeyManager::unregister(self, hotkey)
    }
}

/// Registry over a `HotkeyBackend`.
///
/// global_hotkey has no query API, and on macOS a second registration of a
/// held combo fails with `FailedToRegister` rather than `AlreadyRegistered`.
/// `held` is therefore the source of truth: it changes only when the OS
/// confirms a register or unregister.
/// NOTE: Must be created on the main thread (macOS event loop requirement).
pub struct GlobalHotkeyRegistry<B: HotkeyBackend = GlobalHotKeyManager> {
    backend: B,
    /// Action -> parsed HotKey (needed for unregistration)
    hotkeys: HashMap<HotkeyAction, HotKey>,
    /// Action -> canonical shortcut string
    shortcuts: HashMap<HotkeyAction, String>,
    /// Actions this registry currently holds with the OS
    held: HashSet<HotkeyAction>,
}

impl GlobalHotkeyRegistry {
    pub fn new(bindings: &[(HotkeyAction, String)]) -> anyhow::Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| anyhow::anyhow!("Failed to create hotkey manager: {}", e))?;
        Ok(Self::with_backend(manager, bindings))
    }
}

impl<B: HotkeyBackend> GlobalHotkeyRegistry<B> {
    pub fn with_backend(backend: B, bindings: &[(HotkeyAction, String)]) -> Self {
        let mut registry = Self {
            backend,
            hotkeys: HashMap::new(),
            shortcuts: HashMap::new(),
            held: HashSet::new(),
        };
        registry.rebind(bindings);
        registry
    }

    fn hotkey(&self, action: HotkeyAction) -> Result<HotKey> {
        self.hotkeys
            .get(&action)
            .copied()
            .ok_or_else(|| FinderEnhanceError::Registration {
                action: action.to_string(),
                reason: "no valid shortcut bound".to_string(),
            })
    }
}

impl<B: HotkeyBackend> HotkeyRegistry for GlobalHotkeyRegistry<B> {
    fn register(&mut self, action: HotkeyAction) -> Result<()> {
        if self.held.contains(&action) {
            return Ok(());
        }
        let hotkey = self.hotkey(action)?;
        self.backend
            .register(hotkey)
            .map_err(|e| FinderEnhanceError::Registration {
                action: action.to_string(),
                reason: format_hotkey_error(&e, &self.shortcut_for(action)),
            })?;
        self.held.insert(action);
        Ok(())
    }

    fn unregister(&mut self, action: HotkeyAction) -> Result<()> {
        if !self.held.contains(&action) {
            return Ok(());
        }
        let hotkey = self.hotkey(action)?;
        // Stays held on failure so the health check retries the release
        self.backend
            .unregister(hotkey)
            .map_err(|e| FinderEnhanceError::Registration {
                action: action.to_string(),
                reason: format!("unregister failed: {}", e),
            })?;
        self.held.remove(&action);
        Ok(())
    }

    fn is_registered(&mut self, action: HotkeyAction) -> bool {
        self.held.contains(&action)
    }

    fn shortcut_for(&self, action: HotkeyAction) -> String {
        self.shortcuts
            .get(&action)
            .cloned()
            .unwrap_or_else(|| "<unbound>".to_string())
    }

    fn rebind(&mut self, bindings: &[(HotkeyAction, String)]) {
        let held: Vec<HotkeyAction> = self.held.iter().copied().collect();
        for action in held {
            self.unregister(action).warn_on_err();
        }
        // A combo that refused to release is lost with its old binding
        self.held.clear();

        self.hotkeys.clear();
        self.shortcuts.clear();
        let mut ids = HOTKEY_ACTIONS.write();
        ids.clear();

        for (action, shortcut) in bindings {
            match shortcuts::to_hotkey(shortcut) {
                Ok(hotkey) => {
                    ids.insert(hotkey.id(), *action);
                    self.hotkeys.insert(*action, hotkey);
                    self.shortcuts.insert(*action, shortcut.clone());
                    logging::log(
                        "HOTKEY",
                        &format!("Bound {} to '{}' (id: {})", action, shortcut, hotkey.id()),
                    );
                }
                Err(e) => {
                    logging::log_error(
                        "HOTKEY",
                        &format!("Failed to parse shortcut '{}' for {}: {}", shortcut, action, e),
                        None,
                    );
                }
            }
        }
    }
}

impl<B: HotkeyBackend> Drop for GlobalHotkeyRegistry<B> {
    fn drop(&mut self) {
        for action in &self.held {
            if let Some(hotkey) = self.hotkeys.get(action) {
                let _ = self.backend.unregister(*hotkey);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{ArbiterSettings, ClaimInputs, HotkeyArbiter};
    use crate::context::SelectionDescriptor;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_default_bindings() {
        let bindings = shortcut_bindings(&Config::default());
        let lookup: HashMap<_, _> = bindings.into_iter().collect();
        assert_eq!(lookup[&HotkeyAction::Preview], "space");
        assert_eq!(lookup[&HotkeyAction::Cut], "cmd+x");
        assert_eq!(lookup[&HotkeyAction::Paste], "cmd+v");
        assert_eq!(lookup[&HotkeyAction::ForcePreview], "cmd+shift+p");
    }

    #[test]
    fn test_action_names_are_unique() {
        let names: HashSet<&str> = HotkeyAction::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(names.len(), HotkeyAction::ALL.len());
    }

    /// Behaves like the macOS backend: a combo that is already registered
    /// fails with `FailedToRegister`, never `AlreadyRegistered`.
    #[derive(Default, Clone)]
    struct CarbonLikeBackend {
        registered: Rc<RefCell<HashSet<u32>>>,
        register_calls: Rc<Cell<usize>>,
        refuse_unregister: Rc<Cell<bool>>,
    }

    impl CarbonLikeBackend {
        fn holds(&self, shortcut: &str) -> bool {
            let id = shortcuts::to_hotkey(shortcut).unwrap().id();
            self.registered.borrow().contains(&id)
        }
    }

    impl HotkeyBackend for CarbonLikeBackend {
        fn register(&self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
            self.register_calls.set(self.register_calls.get() + 1);
            if !self.registered.borrow_mut().insert(hotkey.id()) {
                return Err(HotkeyError::FailedToRegister(format!("{:?}", hotkey)));
            }
            Ok(())
        }

        fn unregister(&self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
            if self.refuse_unregister.get() {
                return Err(HotkeyError::FailedToUnRegister(hotkey));
            }
            self.registered.borrow_mut().remove(&hotkey.id());
            Ok(())
        }
    }

    fn carbon_registry() -> (GlobalHotkeyRegistry<CarbonLikeBackend>, CarbonLikeBackend) {
        let backend = CarbonLikeBackend::default();
        let registry =
            GlobalHotkeyRegistry::with_backend(backend.clone(), &shortcut_bindings(&Config::default()));
        (registry, backend)
    }

    #[test]
    fn test_held_action_is_not_registered_twice() {
        let (mut registry, backend) = carbon_registry();

        registry.register(HotkeyAction::Preview).unwrap();
        registry.register(HotkeyAction::Preview).unwrap();

        assert_eq!(backend.register_calls.get(), 1);
        assert!(registry.is_registered(HotkeyAction::Preview));
        assert!(backend.holds("space"));
    }

    #[test]
    fn test_unregister_of_unheld_action_is_noop() {
        let (mut registry, backend) = carbon_registry();
        backend.refuse_unregister.set(true);
        assert!(registry.unregister(HotkeyAction::Cut).is_ok());
        assert!(!registry.is_registered(HotkeyAction::Cut));
    }

    #[test]
    fn test_failed_release_stays_held_until_it_succeeds() {
        let (mut registry, backend) = carbon_registry();
        registry.register(HotkeyAction::Paste).unwrap();

        backend.refuse_unregister.set(true);
        assert!(registry.unregister(HotkeyAction::Paste).is_err());
        assert!(registry.is_registered(HotkeyAction::Paste));

        backend.refuse_unregister.set(false);
        registry.unregister(HotkeyAction::Paste).unwrap();
        assert!(!registry.is_registered(HotkeyAction::Paste));
        assert!(!backend.holds("cmd+v"));
    }

    #[test]
    fn test_health_check_keeps_held_key_and_leaving_finder_releases_it() {
        let t0 = Instant::now();
        let (mut registry, backend) = carbon_registry();
        let mut arbiter = HotkeyArbiter::new(ArbiterSettings::default(), Duration::from_secs(5), t0);

        let in_finder = ClaimInputs {
            finder_active: true,
            selection: SelectionDescriptor::Folder("Docs".to_string()),
            has_cut_files: false,
        };
        arbiter.evaluate(&in_finder, t0, &mut registry);
        assert!(backend.holds("space"));

        let corrected = arbiter.reconcile(&in_finder, t0 + Duration::from_secs(5), &mut registry);
        assert!(corrected.is_empty());
        assert!(arbiter.is_claimed(HotkeyAction::Preview));
        assert!(backend.holds("space"));

        let elsewhere = ClaimInputs {
            finder_active: false,
            ..in_finder
        };
        arbiter.evaluate(&elsewhere, t0 + Duration::from_secs(6), &mut registry);
        assert!(!arbiter.is_claimed(HotkeyAction::Preview));
        assert!(!backend.holds("space"));
        assert!(!backend.holds("cmd+x"));
    }

    #[test]
    fn test_bound_ids_resolve_to_actions() {
        let (_registry, _backend) = carbon_registry();
        let id = shortcuts::to_hotkey("cmd+shift+p").unwrap().id();
        assert_eq!(action_for_hotkey_id(id), Some(HotkeyAction::ForcePreview));
    }

    #[test]
    fn test_drop_releases_held_keys() {
        let (mut registry, backend) = carbon_registry();
        registry.register(HotkeyAction::Cut).unwrap();
        drop(registry);
        assert!(backend.registered.borrow().is_empty());
    }

    // GlobalHotKeyManager needs an event loop and OS permissions; these run
    // only where it can be constructed.
    #[cfg(feature = "system-tests")]
    mod system {
        use super::*;

        #[test]
        fn test_register_then_query() {
            let bindings = shortcut_bindings(&Config::default());
            let Ok(mut registry) = GlobalHotkeyRegistry::new(&bindings) else {
                return;
            };
            if registry.register(HotkeyAction::ForcePreview).is_ok() {
                assert!(registry.is_registered(HotkeyAction::ForcePreview));
                registry.unregister(HotkeyAction::ForcePreview).unwrap();
                assert!(!registry.is_registered(HotkeyAction::ForcePreview));
            }
        }
    }
}
