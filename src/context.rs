//! Server context: the state a running gateway owns.
//!
//! Handlers, the reload coordinator and the admin API receive an
//! `Arc<ServerContext>` explicitly; nothing is looked up ambiently.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::routing::{MountTableHandle, PathPrefix};
use crate::service::{GatewayPolicy, SubAppFactory};

/// Counters describing reload history since startup.
#[derive(Debug, Default)]
pub struct ReloadStats {
    attempts: AtomicU64,
    committed: AtomicU64,
    rejected: AtomicU64,
    rolled_back: AtomicU64,
}

/// Point-in-time copy of [`ReloadStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReloadStatsSnapshot {
    pub attempts: u64,
    pub committed: u64,
    pub rejected: u64,
    pub rolled_back: u64,
}

impl ReloadStats {
    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_committed(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rolled_back(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReloadStatsSnapshot {
        ReloadStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
        }
    }
}

pub struct ServerContext {
    mounts: MountTableHandle,
    policy: GatewayPolicy,
    factory: Arc<dyn SubAppFactory>,
    prefix: PathPrefix,
    config_path: Option<PathBuf>,
    reload_lock: Mutex<()>,
    stats: ReloadStats,
}

impl ServerContext {
    pub fn new(policy: GatewayPolicy, factory: Arc<dyn SubAppFactory>) -> Self {
        Self {
            mounts: MountTableHandle::new(),
            policy,
            factory,
            prefix: PathPrefix::default(),
            config_path: None,
            reload_lock: Mutex::new(()),
            stats: ReloadStats::default(),
        }
    }

    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.prefix = PathPrefix::new(prefix);
        self
    }

    /// File the admin API reloads from.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn mounts(&self) -> &MountTableHandle {
        &self.mounts
    }

    pub fn policy(&self) -> &GatewayPolicy {
        &self.policy
    }

    pub fn factory(&self) -> &dyn SubAppFactory {
        self.factory.as_ref()
    }

    pub fn prefix(&self) -> &PathPrefix {
        &self.prefix
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn stats(&self) -> &ReloadStats {
        &self.stats
    }

    /// Serializes reconciliation. Readers of the mount table never take it.
    pub(crate) fn reload_lock(&self) -> &Mutex<()> {
        &self.reload_lock
    }

    /// Tear down every mounted sub-service. Used at process shutdown.
    pub fn teardown_all(&self) {
        let table = self.mounts.snapshot();
        for entry in table.iter() {
            entry.handle.teardown();
        }
        tracing::info!(count = table.len(), "Tore down mounted services");
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("prefix", &self.prefix)
            .field("config_path", &self.config_path)
            .field("mounted", &self.mounts.snapshot().len())
            .finish()
    }
}
