//! Handoff from the watcher thread into the tokio runtime.
//!
//! # Responsibilities
//! - Capture the runtime that owns the server context at construction
//! - Carry change signals across threads without touching shared state
//! - Run reloads one at a time on that runtime
//!
//! # Design Decisions
//! - An unbounded channel is the only thing the watcher thread touches;
//!   sending never blocks the observer
//! - The worker waits a settle delay before reading the file so multi-step
//!   atomic writes can finish, then coalesces signals that queued meanwhile
//! - A failed handoff is logged and dropped; the mounted set stays at the
//!   last config that applied cleanly

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::context::ServerContext;
use crate::reload::coordinator;

/// A logical "config file changed" signal.
#[derive(Debug, Clone)]
pub struct ReloadSignal {
    pub path: PathBuf,
    pub detected_at: Instant,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("cannot start a watcher before the hosting scheduler is running")]
    NoScheduler,
}

/// Sending half of the handoff. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReloadBridge {
    tx: mpsc::UnboundedSender<ReloadSignal>,
    path: PathBuf,
}

impl ReloadBridge {
    /// Capture the current runtime and spawn the reload worker on it.
    ///
    /// The worker exits once every clone of the bridge is dropped and the
    /// queued signals are drained.
    pub fn new(
        ctx: Arc<ServerContext>,
        config_path: impl Into<PathBuf>,
        settle: Duration,
    ) -> Result<(Self, JoinHandle<()>), BridgeError> {
        let handle = Handle::try_current().map_err(|_| {
            tracing::error!("Reload bridge created outside of a tokio runtime");
            BridgeError::NoScheduler
        })?;
        Ok(Self::with_handle(&handle, ctx, config_path, settle))
    }

    /// Same as [`ReloadBridge::new`] with an explicit runtime handle, for
    /// callers constructing the bridge off-runtime.
    pub fn with_handle(
        handle: &Handle,
        ctx: Arc<ServerContext>,
        config_path: impl Into<PathBuf>,
        settle: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = handle.spawn(run_worker(ctx, rx, settle));
        let bridge = Self {
            tx,
            path: config_path.into(),
        };
        (bridge, worker)
    }

    /// Hand a change signal to the runtime. Returns false if it was dropped.
    pub fn signal(&self) -> bool {
        let signal = ReloadSignal {
            path: self.path.clone(),
            detected_at: Instant::now(),
        };
        match self.tx.send(signal) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(path = ?self.path, "Reload worker is gone, dropping config change signal");
                false
            }
        }
    }
}

async fn run_worker(ctx: Arc<ServerContext>, mut rx: mpsc::UnboundedReceiver<ReloadSignal>, settle: Duration) {
    tracing::debug!(settle_ms = settle.as_millis() as u64, "Reload worker started");

    while let Some(signal) = rx.recv().await {
        tokio::time::sleep(settle).await;

        let mut coalesced = 0usize;
        while rx.try_recv().is_ok() {
            coalesced += 1;
        }

        tracing::info!(
            path = ?signal.path,
            waited_ms = signal.detected_at.elapsed().as_millis() as u64,
            coalesced,
            "Config file changed, reloading"
        );

        match coordinator::reload_from_path(&ctx, &signal.path).await {
            Ok(outcome) => tracing::debug!(generation = outcome.generation, "Reload finished"),
            // Already logged by the coordinator; the next change is the retry.
            Err(e) => tracing::debug!(error = %e, "Reload failed"),
        }
    }

    tracing::debug!("Reload worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{GatewayPolicy, RouterFactory};

    fn ctx() -> Arc<ServerContext> {
        Arc::new(ServerContext::new(GatewayPolicy::default(), Arc::new(RouterFactory)))
    }

    #[test]
    fn test_requires_runtime() {
        let err = ReloadBridge::new(ctx(), "/tmp/gw.json", Duration::ZERO).unwrap_err();
        assert!(err.to_string().contains("before the hosting scheduler is running"));
    }

    #[tokio::test]
    async fn test_signal_reloads_on_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gw.json");
        std::fs::write(&path, r#"{"mcpServers": {"a": {"command": "echo"}}}"#).unwrap();

        let ctx = ctx();
        let (bridge, worker) = ReloadBridge::new(ctx.clone(), &path, Duration::from_millis(10)).unwrap();

        // Signals sent from a plain thread, as the watcher does.
        let sender = bridge.clone();
        std::thread::spawn(move || {
            assert!(sender.signal());
        })
        .join()
        .unwrap();
        drop(bridge);

        worker.await.unwrap();
        assert!(ctx.mounts().snapshot().contains("a"));
        assert_eq!(ctx.stats().snapshot().attempts, 1);
    }

    #[tokio::test]
    async fn test_queued_signals_coalesce() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gw.json");
        std::fs::write(&path, r#"{"mcpServers": {}}"#).unwrap();

        let ctx = ctx();
        let (bridge, worker) = ReloadBridge::new(ctx.clone(), &path, Duration::from_millis(50)).unwrap();
        for _ in 0..3 {
            bridge.signal();
        }
        drop(bridge);

        worker.await.unwrap();
        assert_eq!(ctx.stats().snapshot().attempts, 1);
    }

    #[tokio::test]
    async fn test_signal_after_worker_gone_is_dropped() {
        let (bridge, worker) = ReloadBridge::new(ctx(), "/tmp/gw.json", Duration::ZERO).unwrap();
        worker.abort();
        let _ = worker.await;
        assert!(!bridge.signal());
    }
}
