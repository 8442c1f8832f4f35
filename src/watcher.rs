use notify::{recommended_watcher, EventKind, RecursiveMode, Result as NotifyResult, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{load_config_from, Config};

/// Quiet period after the last write before the file is re-read
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);

/// Whether a filesystem event touches `config_path` in a way worth reloading
pub fn is_config_change(event: &notify::Event, config_path: &Path) -> bool {
    let relevant_kind = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
    let file_name = config_path.file_name();
    relevant_kind
        && event
            .paths
            .iter()
            .any(|path| path.file_name().is_some() && path.file_name() == file_name)
}

/// Watches the config file and hands each reloaded `Config` to a callback.
pub struct ConfigWatcher {
    config_path: PathBuf,
    watcher_thread: Option<thread::JoinHandle<()>>,
}

impl ConfigWatcher {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            watcher_thread: None,
        }
    }

    /// Spawn the watch thread. `on_reload` returns false to stop watching.
    pub fn start<F>(&mut self, on_reload: F)
    where
        F: Fn(Config) -> bool + Send + 'static,
    {
        let config_path = self.config_path.clone();
        let handle = thread::spawn(move || {
            if let Err(e) = Self::watch_loop(&config_path, on_reload) {
                warn!(error = %e, watcher = "config", "Config watcher error");
            }
        });
        self.watcher_thread = Some(handle);
    }

    fn watch_loop<F>(config_path: &Path, on_reload: F) -> NotifyResult<()>
    where
        F: Fn(Config) -> bool,
    {
        // Editors often replace the file, so watch its directory
        let watch_path = config_path.parent().unwrap_or_else(|| Path::new("."));
        if !watch_path.exists() {
            info!(path = %watch_path.display(), "Config directory missing, watcher not started");
            return Ok(());
        }

        let (watch_tx, watch_rx) = channel();
        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = watch_tx.send(res);
        })?;
        watcher.watch(watch_path, RecursiveMode::NonRecursive)?;

        info!(path = %config_path.display(), "Config watcher started");

        let mut pending = false;
        loop {
            let timeout = if pending {
                RELOAD_DEBOUNCE
            } else {
                Duration::from_secs(3600)
            };
            match watch_rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    if is_config_change(&event, config_path) {
                        pending = true;
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, watcher = "config", "File watcher error");
                }
                Err(RecvTimeoutError::Timeout) => {
                    if pending {
                        pending = false;
                        info!(path = %config_path.display(), "Config file changed, reloading");
                        if !on_reload(load_config_from(config_path)) {
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(watcher = "config", "Config watcher shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_writes_to_the_config_file_count() {
        let config = Path::new("/home/me/.finder-enhance/config.json");

        assert!(is_config_change(
            &event(EventKind::Modify(ModifyKind::Any), "/home/me/.finder-enhance/config.json"),
            config
        ));
        assert!(is_config_change(
            &event(EventKind::Create(CreateKind::File), "/home/me/.finder-enhance/config.json"),
            config
        ));
        assert!(!is_config_change(
            &event(EventKind::Remove(RemoveKind::File), "/home/me/.finder-enhance/config.json"),
            config
        ));
        assert!(!is_config_change(
            &event(EventKind::Modify(ModifyKind::Any), "/home/me/.finder-enhance/other.json"),
            config
        ));
    }
}
