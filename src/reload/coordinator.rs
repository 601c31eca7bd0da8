//! Reload coordinator.
//!
//! # Responsibilities
//! - Parse and validate a new config as a whole
//! - Diff it against the mounted set
//! - Build handles for added and changed services
//! - Publish the new table in one step, then release what it replaced
//!
//! # Design Decisions
//! - All-or-nothing: a parse, validation or construction failure leaves the
//!   published table exactly as it was
//! - New handles are built before anything is published, so rollback only
//!   has to release handles nobody has seen
//! - One reconciliation at a time, serialized by the context's reload lock

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::ConfigMap;
use crate::context::ServerContext;
use crate::observability::metrics;
use crate::reload::diff::ConfigDiff;
use crate::routing::{MountEntry, MountTable};
use crate::service::{BuildError, SubApp};

/// Stages of one reload attempt, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    Validating,
    Diffing,
    Mounting,
    Committed,
    Rejected,
    RolledBack,
}

impl fmt::Display for ReloadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReloadPhase::Validating => "validating",
            ReloadPhase::Diffing => "diffing",
            ReloadPhase::Mounting => "mounting",
            ReloadPhase::Committed => "committed",
            ReloadPhase::Rejected => "rejected",
            ReloadPhase::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

/// Error type for a failed reload. The mounted set is unchanged in every case.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("config rejected: {0}")]
    Rejected(#[from] ConfigError),

    #[error("failed to build service '{name}': {source}")]
    Build {
        name: String,
        #[source]
        source: BuildError,
    },
}

impl ReloadError {
    pub fn phase(&self) -> ReloadPhase {
        match self {
            ReloadError::Rejected(_) => ReloadPhase::Rejected,
            ReloadError::Build { .. } => ReloadPhase::RolledBack,
        }
    }
}

/// What a committed reload changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    pub generation: u64,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ReloadOutcome {
    fn new(diff: ConfigDiff, generation: u64) -> Self {
        Self {
            generation,
            added: diff.added,
            removed: diff.removed,
            updated: diff.updated,
            unchanged: diff.unchanged,
        }
    }
}

/// Handles built during an attempt but not yet published. Dropping the
/// guard without committing tears them all down.
struct PendingMounts {
    built: Vec<(String, Arc<SubApp>)>,
}

impl PendingMounts {
    fn new() -> Self {
        Self { built: Vec::new() }
    }

    fn push(&mut self, name: String, app: SubApp) {
        self.built.push((name, Arc::new(app)));
    }

    fn commit(mut self) -> HashMap<String, Arc<SubApp>> {
        std::mem::take(&mut self.built).into_iter().collect()
    }
}

impl Drop for PendingMounts {
    fn drop(&mut self) {
        for (_, app) in self.built.drain(..) {
            app.teardown();
        }
    }
}

/// Reconcile the mounted set with raw config bytes.
pub async fn reload(ctx: &ServerContext, raw: &[u8]) -> Result<ReloadOutcome, ReloadError> {
    let _guard = ctx.reload_lock().lock().await;
    ctx.stats().record_attempt();
    tracing::debug!(phase = %ReloadPhase::Validating, bytes = raw.len(), "Reload started");
    run(ctx, parse_config(raw)).await
}

/// Read `path` and reconcile with its contents.
///
/// The file is read under the reload lock, so concurrent callers commit
/// contents in the order they were read.
pub async fn reload_from_path(ctx: &ServerContext, path: &Path) -> Result<ReloadOutcome, ReloadError> {
    let _guard = ctx.reload_lock().lock().await;
    let raw = tokio::fs::read(path).await;
    ctx.stats().record_attempt();
    tracing::debug!(phase = %ReloadPhase::Validating, path = ?path, "Reload started");
    let parsed = raw.map_err(ConfigError::from).and_then(|raw| parse_config(&raw));
    run(ctx, parsed).await
}

/// Reconcile with an already validated config.
pub async fn apply(ctx: &ServerContext, config: ConfigMap) -> Result<ReloadOutcome, ReloadError> {
    let _guard = ctx.reload_lock().lock().await;
    ctx.stats().record_attempt();
    run(ctx, Ok(config)).await
}

async fn run(ctx: &ServerContext, parsed: Result<ConfigMap, ConfigError>) -> Result<ReloadOutcome, ReloadError> {
    let config = match parsed {
        Ok(config) => config,
        Err(e) => {
            ctx.stats().record_rejected();
            metrics::record_reload(ReloadPhase::Rejected);
            tracing::error!(phase = %ReloadPhase::Rejected, error = %e, "Config reload rejected, keeping current services");
            return Err(ReloadError::Rejected(e));
        }
    };

    let current = ctx.mounts().snapshot();
    let diff = ConfigDiff::between(current.config(), &config);
    tracing::debug!(
        phase = %ReloadPhase::Diffing,
        added = ?diff.added,
        removed = ?diff.removed,
        updated = ?diff.updated,
        "Computed config diff"
    );

    if diff.is_noop() {
        ctx.stats().record_committed();
        metrics::record_reload(ReloadPhase::Committed);
        tracing::info!(generation = current.generation(), "Config unchanged, nothing to apply");
        return Ok(ReloadOutcome::new(diff, current.generation()));
    }

    let mut pending = PendingMounts::new();
    for name in diff.to_build() {
        tracing::debug!(phase = %ReloadPhase::Mounting, service = %name, "Building service");
        match ctx.factory().create(name, &config[name], ctx.policy()).await {
            Ok(app) => pending.push(name.clone(), app),
            Err(source) => {
                // Dropping `pending` releases everything built so far.
                drop(pending);
                ctx.stats().record_rolled_back();
                metrics::record_reload(ReloadPhase::RolledBack);
                tracing::error!(
                    phase = %ReloadPhase::RolledBack,
                    service = %name,
                    error = %source,
                    "Service construction failed, reload rolled back"
                );
                return Err(ReloadError::Build {
                    name: name.clone(),
                    source,
                });
            }
        }
    }

    let mut built = pending.commit();
    let mut entries = BTreeMap::new();
    for (name, spec) in config {
        let handle = match built.remove(&name) {
            Some(handle) => handle,
            None => match current.get(&name) {
                Some(existing) => existing.handle.clone(),
                // Unreachable while diff and table agree.
                None => continue,
            },
        };
        entries.insert(name.clone(), MountEntry { name, spec, handle });
    }

    let generation = current.generation() + 1;
    let table = MountTable::new(entries, generation);
    let mounted = table.len();
    let previous = ctx.mounts().publish(table);

    for name in diff.to_release() {
        if let Some(entry) = previous.get(name) {
            entry.handle.teardown();
        }
    }

    ctx.stats().record_committed();
    metrics::record_reload(ReloadPhase::Committed);
    metrics::record_mounted(mounted);
    tracing::info!(
        phase = %ReloadPhase::Committed,
        generation,
        mounted,
        added = ?diff.added,
        removed = ?diff.removed,
        updated = ?diff.updated,
        "Config reload committed"
    );

    Ok(ReloadOutcome::new(diff, generation))
}
