//! Startup orchestration.
//!
//! # Responsibilities
//! - Load, validate and mount the initial configuration
//! - Start the config watcher when hot reload is enabled
//!
//! # Design Decisions
//! - Fail fast: an invalid initial config is a startup error
//! - A watcher that cannot start is logged; the gateway keeps serving
//!   the config it booted with

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{load_config, ConfigError, ConfigWatcher, WatchError, WatchOptions};
use crate::context::ServerContext;
use crate::reload::{self, BridgeError, ReloadBridge, ReloadError, ReloadOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load config {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("failed to mount initial services: {0}")]
    Mount(#[from] ReloadError),
}

/// Mount the services of the config at `path`.
pub async fn bootstrap(ctx: &ServerContext, path: &Path) -> Result<ReloadOutcome, StartupError> {
    let config = load_config(path).map_err(|source| StartupError::Config {
        path: path.display().to_string(),
        source,
    })?;
    let outcome = reload::apply(ctx, config).await?;
    tracing::info!(
        path = ?path,
        services = ?outcome.added,
        "Initial configuration mounted"
    );
    Ok(outcome)
}

#[derive(Debug, thiserror::Error)]
pub enum WatcherStartError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// A running config watcher and the task that applies its reloads.
pub struct HotReload {
    watcher: ConfigWatcher,
    worker: JoinHandle<()>,
}

impl HotReload {
    /// Stop watching, then wait for any reload already queued to finish.
    ///
    /// Joining the observer thread drops the last bridge sender, which lets
    /// the worker drain its queue and exit.
    pub async fn shutdown(self) {
        let Self { watcher, worker } = self;
        if let Err(e) = tokio::task::spawn_blocking(move || watcher.stop()).await {
            tracing::error!(error = %e, "Failed to stop config watcher");
        }
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Reload worker did not exit cleanly");
        }
    }
}

/// Start hot reload for `options.config_path`. Must run on the runtime that
/// hosts `ctx`.
pub fn start_watcher(ctx: Arc<ServerContext>, options: &WatchOptions) -> Result<HotReload, WatcherStartError> {
    let (bridge, worker) = ReloadBridge::new(ctx, options.config_path.clone(), options.debounce_window())?;
    let watcher = ConfigWatcher::start(options, bridge)?;
    Ok(HotReload { watcher, worker })
}
