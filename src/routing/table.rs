//! The live mount table.
//!
//! # Responsibilities
//! - Hold name → mounted sub-service together with the config it came from
//! - Give request handlers a consistent snapshot without locking
//! - Accept a whole replacement table from the single writer
//!
//! # Design Decisions
//! - Entries and config live in one immutable value, so a reader can never
//!   see one without the other
//! - `ArcSwap` makes publish a single atomic pointer store
//! - Handles are `Arc`-shared so retained entries survive a reload untouched

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::{ConfigMap, ServerSpec};
use crate::service::SubApp;

/// One mounted sub-service.
#[derive(Debug, Clone)]
pub struct MountEntry {
    pub name: String,
    pub spec: ServerSpec,
    pub handle: Arc<SubApp>,
}

/// Immutable view of everything currently mounted.
#[derive(Debug, Default)]
pub struct MountTable {
    entries: BTreeMap<String, MountEntry>,
    config: ConfigMap,
    generation: u64,
}

impl MountTable {
    /// Build a table; the stored config is derived from the entries so the
    /// two key sets always agree.
    pub fn new(entries: BTreeMap<String, MountEntry>, generation: u64) -> Self {
        let config = entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.spec.clone()))
            .collect();
        Self {
            entries,
            config,
            generation,
        }
    }

    pub fn get(&self, name: &str) -> Option<&MountEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last applied config.
    pub fn config(&self) -> &ConfigMap {
        &self.config
    }

    /// Incremented on every publish.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared handle to the current [`MountTable`].
#[derive(Debug)]
pub struct MountTableHandle {
    current: ArcSwap<MountTable>,
}

impl MountTableHandle {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(MountTable::default()),
        }
    }

    /// Lock-free read of the current table.
    pub fn snapshot(&self) -> Arc<MountTable> {
        self.current.load_full()
    }

    /// Replace the table, returning the one it superseded.
    ///
    /// Only the reload coordinator and bootstrap call this.
    pub(crate) fn publish(&self, table: MountTable) -> Arc<MountTable> {
        self.current.swap(Arc::new(table))
    }
}

impl Default for MountTableHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> MountEntry {
        let spec = ServerSpec::Local {
            command: "echo".into(),
            args: vec![name.into()],
            env: Default::default(),
        };
        MountEntry {
            name: name.into(),
            handle: Arc::new(SubApp::new(name, spec.clone(), axum::Router::new())),
            spec,
        }
    }

    #[test]
    fn test_config_tracks_entries() {
        let entries: BTreeMap<_, _> = ["a", "b"].iter().map(|n| (n.to_string(), entry(n))).collect();
        let table = MountTable::new(entries, 3);
        assert_eq!(table.config().keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.generation(), 3);
    }

    #[test]
    fn test_snapshot_survives_publish() {
        let handle = MountTableHandle::new();
        let before = handle.snapshot();
        assert!(before.is_empty());

        let entries: BTreeMap<_, _> = [("a".to_string(), entry("a"))].into_iter().collect();
        let previous = handle.publish(MountTable::new(entries, 1));

        // Old readers keep their view, new readers see the new one.
        assert!(Arc::ptr_eq(&before, &previous));
        assert!(before.is_empty());
        assert!(handle.snapshot().contains("a"));
    }
}
