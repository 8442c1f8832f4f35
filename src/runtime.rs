//! Process wiring: worker threads feed one event channel, and the
//! coordinator consumes it.
//!
//! On macOS the coordinator lives on the main thread (AppKit requires it).
//! A pump thread forwards each event there through GCD while `NSApp` runs.
//! Elsewhere the main thread consumes the channel directly.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use async_channel::{Receiver, Sender};
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};

use crate::app::{AppEvent, AppPorts, FinderEnhanceApp, Flow};
use crate::config::Config;
use crate::content::FsContentAdapter;
use crate::hotkeys::{action_for_hotkey_id, shortcut_bindings, GlobalHotkeyRegistry};
use crate::logging;
use crate::platform::{self, SystemScreen};
use crate::probe::{ContextProbe, OsascriptProbe};
use crate::surface::SurfaceEventSink;
use crate::watcher::ConfigWatcher;

/// Set from the signal handler; polled by the shutdown watcher
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_termination(_signal: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    let handler = handle_termination as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

/// Start every worker, then run the coordinator until shutdown.
pub fn run(config: Config, config_path: PathBuf) -> anyhow::Result<()> {
    install_signal_handlers();
    platform::configure_as_accessory_app();

    let (tx, rx) = async_channel::unbounded::<AppEvent>();
    let frames_wanted = Arc::new(AtomicBool::new(false));

    let ports = build_ports(&config, &tx)?;
    let app = FinderEnhanceApp::new(config.clone(), ports, Instant::now());
    frames_wanted.store(app.wants_frames(), Ordering::Release);

    spawn_workers(&config, &tx, frames_wanted.clone())?;

    let mut config_watcher = ConfigWatcher::new(config_path);
    let reload_tx = tx.clone();
    config_watcher.start(move |config| {
        reload_tx
            .send_blocking(AppEvent::SettingsChanged(Box::new(config)))
            .is_ok()
    });

    logging::log("APP", "Finder Enhance running");
    drive(app, rx, frames_wanted)
}

fn build_ports(config: &Config, tx: &Sender<AppEvent>) -> anyhow::Result<AppPorts> {
    let registry = GlobalHotkeyRegistry::new(&shortcut_bindings(config))
        .context("Failed to initialize global hotkeys")?;

    let surface_tx = tx.clone();
    let sink: SurfaceEventSink = Arc::new(move |event| {
        let _ = surface_tx.try_send(AppEvent::Surface(event));
    });

    Ok(AppPorts {
        registry: Box::new(registry),
        selection: Box::new(OsascriptProbe::new(
            &config.get_target_app(),
            config.get_probe_timeout(),
        )),
        surface: platform::create_surface(sink),
        screen: Box::new(SystemScreen),
        content: Box::new(FsContentAdapter::from_config(config)),
    })
}

/// Apply one event and publish whether animation frames are needed.
fn dispatch(app: &mut FinderEnhanceApp, event: AppEvent, frames_wanted: &AtomicBool) -> Flow {
    let flow = app.handle_event(event, Instant::now());
    frames_wanted.store(app.wants_frames(), Ordering::Release);
    flow
}

// ============================================================================
// Workers
// ============================================================================

fn spawn_workers(
    config: &Config,
    tx: &Sender<AppEvent>,
    frames_wanted: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let probe = OsascriptProbe::new(&config.get_target_app(), config.get_probe_timeout());
    spawn_probe_loop(probe, config.get_poll_interval(), tx.clone())?;
    spawn_hotkey_listener(tx.clone())?;
    spawn_frame_ticker(config.get_window().frame_interval(), frames_wanted, tx.clone())?;
    spawn_interval_ticker(
        "health-ticker",
        config.get_health_check_interval(),
        AppEvent::HealthTick,
        tx.clone(),
    )?;
    spawn_shutdown_watcher(tx.clone())?;
    Ok(())
}

/// Probe the foreground context on a fixed cadence. Each result carries the
/// instant its probe started so late results can be recognised as stale.
fn spawn_probe_loop<P>(mut probe: P, interval: Duration, tx: Sender<AppEvent>) -> anyhow::Result<()>
where
    P: ContextProbe + 'static,
{
    thread::Builder::new()
        .name("context-probe".into())
        .spawn(move || loop {
            let issued_at = Instant::now();
            let result = probe.poll();
            if tx
                .send_blocking(AppEvent::ProbeCompleted { issued_at, result })
                .is_err()
            {
                break;
            }
            thread::sleep(interval.saturating_sub(issued_at.elapsed()));
        })
        .context("Failed to spawn probe thread")?;
    Ok(())
}

fn spawn_hotkey_listener(tx: Sender<AppEvent>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("hotkey-listener".into())
        .spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            logging::log("HOTKEY", "Hotkey listener started");
            while let Ok(event) = receiver.recv() {
                if event.state != HotKeyState::Pressed {
                    continue;
                }
                let Some(action) = action_for_hotkey_id(event.id) else {
                    logging::log_debug("HOTKEY", &format!("Unknown hotkey id {}", event.id));
                    continue;
                };
                if tx.send_blocking(AppEvent::HotkeyPressed(action)).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn hotkey listener")?;
    Ok(())
}

/// Emit `FrameTick` only while the coordinator has an animation in flight.
fn spawn_frame_ticker(
    interval: Duration,
    frames_wanted: Arc<AtomicBool>,
    tx: Sender<AppEvent>,
) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("frame-ticker".into())
        .spawn(move || loop {
            thread::sleep(interval);
            if tx.is_closed() {
                break;
            }
            // Skip while a tick is still queued to avoid piling up frames
            if frames_wanted.load(Ordering::Acquire)
                && tx.is_empty()
                && tx.send_blocking(AppEvent::FrameTick).is_err()
            {
                break;
            }
        })
        .context("Failed to spawn frame ticker")?;
    Ok(())
}

fn spawn_interval_ticker(
    name: &str,
    interval: Duration,
    event: AppEvent,
    tx: Sender<AppEvent>,
) -> anyhow::Result<()> {
    thread::Builder::new()
        .name(name.into())
        .spawn(move || loop {
            thread::sleep(interval);
            if tx.send_blocking(event.clone()).is_err() {
                break;
            }
        })
        .with_context(|| format!("Failed to spawn {}", name))?;
    Ok(())
}

fn spawn_shutdown_watcher(tx: Sender<AppEvent>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("shutdown-watcher".into())
        .spawn(move || loop {
            thread::sleep(Duration::from_millis(100));
            if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
                logging::log("APP", "Termination signal received");
                let _ = tx.send_blocking(AppEvent::Shutdown);
                break;
            }
        })
        .context("Failed to spawn shutdown watcher")?;
    Ok(())
}

// ============================================================================
// Coordinator loop
// ============================================================================

#[cfg(target_os = "macos")]
fn drive(
    app: FinderEnhanceApp,
    rx: Receiver<AppEvent>,
    frames_wanted: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    use std::cell::RefCell;

    thread_local! {
        static COORDINATOR: RefCell<Option<FinderEnhanceApp>> = const { RefCell::new(None) };
    }

    COORDINATOR.with(|cell| *cell.borrow_mut() = Some(app));

    let pump_rx = rx.clone();
    thread::Builder::new()
        .name("event-pump".into())
        .spawn(move || {
            while let Ok(event) = pump_rx.recv_blocking() {
                let frames_wanted = frames_wanted.clone();
                let rx = pump_rx.clone();
                platform::gcd::dispatch_to_main(move || {
                    COORDINATOR.with(|cell| {
                        let mut slot = cell.borrow_mut();
                        let Some(app) = slot.as_mut() else {
                            return;
                        };
                        if dispatch(app, event, &frames_wanted) == Flow::Exit {
                            slot.take();
                            rx.close();
                            platform::stop_event_loop();
                        }
                    });
                });
            }
        })
        .context("Failed to spawn event pump")?;

    platform::run_event_loop();
    logging::log("APP", "Event loop stopped");
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn drive(
    mut app: FinderEnhanceApp,
    rx: Receiver<AppEvent>,
    frames_wanted: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    while let Ok(event) = rx.recv_blocking() {
        if dispatch(&mut app, event, &frames_wanted) == Flow::Exit {
            break;
        }
    }
    rx.close();
    logging::log("APP", "Event loop stopped");
    Ok(())
}
