//! Diff of two service maps.

use crate::config::schema::ConfigMap;

/// How the service set changes between two configs. Names are in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    /// In new, not in old.
    pub added: Vec<String>,
    /// In old, not in new.
    pub removed: Vec<String>,
    /// In both with a different spec; rebuilt.
    pub updated: Vec<String>,
    /// In both with an identical spec; handle kept.
    pub unchanged: Vec<String>,
}

impl ConfigDiff {
    pub fn between(old: &ConfigMap, new: &ConfigMap) -> Self {
        let mut diff = ConfigDiff::default();

        for (name, spec) in new {
            match old.get(name) {
                None => diff.added.push(name.clone()),
                Some(prev) if prev == spec => diff.unchanged.push(name.clone()),
                Some(_) => diff.updated.push(name.clone()),
            }
        }
        diff.removed = old
            .keys()
            .filter(|name| !new.contains_key(*name))
            .cloned()
            .collect();

        diff
    }

    /// True when applying the new config would change nothing.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Names that need a freshly built handle.
    pub fn to_build(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(self.updated.iter())
    }

    /// Names whose current handle goes away once the new table is live.
    pub fn to_release(&self) -> impl Iterator<Item = &String> {
        self.removed.iter().chain(self.updated.iter())
    }
}
