//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Instant;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::debounce::{DebounceFilter, RawEvent};
use crate::config::schema::WatchOptions;
use crate::reload::ReloadBridge;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("config file does not exist: {0}")]
    MissingFile(PathBuf),

    #[error("config path has no parent directory: {0}")]
    NoParent(PathBuf),

    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

enum ObserverMsg {
    Fs(notify::Result<Event>),
    Stop,
}

/// Watches the config file's directory on a dedicated thread.
///
/// Dropping the watcher stops it; both paths block until the observer
/// thread has exited, after which no further reload can be scheduled.
pub struct ConfigWatcher {
    path: PathBuf,
    tx: mpsc::Sender<ObserverMsg>,
    thread: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Start watching. A missing config file is logged and reported, not retried.
    pub fn start(options: &WatchOptions, bridge: ReloadBridge) -> Result<Self, WatchError> {
        let requested = &options.config_path;
        if !requested.exists() {
            tracing::error!(path = ?requested, "Config file does not exist, not watching");
            return Err(WatchError::MissingFile(requested.clone()));
        }
        let path = requested.canonicalize()?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::NoParent(path.clone()))?;

        let (tx, rx) = mpsc::channel();
        let fs_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = fs_tx.send(ObserverMsg::Fs(res));
            },
            notify::Config::default(),
        )?;
        // Watch the directory so replace-by-rename is seen.
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let filter = DebounceFilter::new(&path, options.debounce_window());
        let thread = std::thread::Builder::new()
            .name("config-watcher".into())
            .spawn(move || observe(watcher, filter, rx, bridge))?;

        tracing::info!(
            path = ?path,
            debounce_ms = options.debounce_window_ms,
            "Config watcher started"
        );

        Ok(Self {
            path,
            tx,
            thread: Some(thread),
        })
    }

    /// Stop watching and wait for the observer thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.tx.send(ObserverMsg::Stop);
        if thread.join().is_err() {
            tracing::error!(path = ?self.path, "Config watcher thread panicked");
        }
        tracing::info!(path = ?self.path, "Config watcher stopped");
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn observe(
    watcher: RecommendedWatcher,
    mut filter: DebounceFilter,
    rx: mpsc::Receiver<ObserverMsg>,
    bridge: ReloadBridge,
) {
    // Keeps the OS subscription alive for as long as this thread runs.
    let _watcher = watcher;

    for msg in rx {
        match msg {
            ObserverMsg::Stop => break,
            ObserverMsg::Fs(Ok(event)) => {
                for raw in RawEvent::from_notify(&event) {
                    if filter.accept(&raw, Instant::now()) {
                        tracing::debug!(path = ?raw.path, kind = ?raw.kind, "Config change detected");
                        bridge.signal();
                    }
                }
            }
            ObserverMsg::Fs(Err(e)) => tracing::warn!(error = %e, "Watch error"),
        }
    }
}
