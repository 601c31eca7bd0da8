//! Debounced filtering of raw filesystem notifications.
//!
//! # Responsibilities
//! - Decide whether a raw event refers to the watched config file
//! - Collapse bursts of matching events into one logical change signal
//!
//! # Design Decisions
//! - Runs on the observer thread; owns its state, touches nothing shared
//! - Created/moved-to events also match by file name and parent directory,
//!   which covers editors that write a temp file and rename it over the target
//! - Time is passed in by the caller so the filter is deterministic under test

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// Kinds of raw events the filter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Modified,
    Created,
    MovedTo,
    Other,
}

/// A raw filesystem notification, reduced to what the filter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl RawEvent {
    pub fn new(kind: RawEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            is_dir: false,
        }
    }

    /// Reduce a `notify` event to the raw events it carries.
    pub fn from_notify(event: &Event) -> Vec<RawEvent> {
        let single = |kind: RawEventKind, path: Option<&PathBuf>, is_dir: bool| -> Vec<RawEvent> {
            path.map(|p| RawEvent {
                kind,
                path: p.clone(),
                is_dir,
            })
            .into_iter()
            .collect()
        };

        match event.kind {
            EventKind::Create(CreateKind::Folder) => single(RawEventKind::Created, event.paths.first(), true),
            EventKind::Create(_) => single(RawEventKind::Created, event.paths.first(), false),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                single(RawEventKind::MovedTo, event.paths.first(), false)
            }
            // (from, to)
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                single(RawEventKind::MovedTo, event.paths.get(1), false)
            }
            EventKind::Modify(ModifyKind::Name(_)) => single(RawEventKind::Other, event.paths.first(), false),
            EventKind::Modify(_) => event
                .paths
                .iter()
                .map(|p| RawEvent::new(RawEventKind::Modified, p.clone()))
                .collect(),
            _ => single(RawEventKind::Other, event.paths.first(), false),
        }
    }
}

/// Debounce state for one watched path.
#[derive(Debug)]
pub struct DebounceFilter {
    watched: PathBuf,
    file_name: Option<std::ffi::OsString>,
    parent: Option<PathBuf>,
    window: Duration,
    last_trigger: Option<Instant>,
}

impl DebounceFilter {
    /// Create a filter for `watched`, resolving it once up front.
    pub fn new(watched: &Path, window: Duration) -> Self {
        let watched = resolve(watched);
        Self {
            file_name: watched.file_name().map(|n| n.to_os_string()),
            parent: watched.parent().map(resolve),
            watched,
            window,
            last_trigger: None,
        }
    }

    /// Returns true if the event refers to the watched file.
    pub fn matches(&self, event: &RawEvent) -> bool {
        if event.is_dir || event.kind == RawEventKind::Other {
            return false;
        }
        if resolve(&event.path) == self.watched {
            return true;
        }
        match event.kind {
            RawEventKind::Created | RawEventKind::MovedTo => {
                event.path.file_name() == self.file_name.as_deref()
                    && event.path.parent().map(resolve) == self.parent
            }
            _ => false,
        }
    }

    /// Feed one event. Returns true when a logical change signal should fire.
    pub fn accept(&mut self, event: &RawEvent, now: Instant) -> bool {
        if !self.matches(event) {
            return false;
        }
        if let Some(last) = self.last_trigger {
            if now.saturating_duration_since(last) < self.window {
                tracing::trace!(path = ?event.path, kind = ?event.kind, "Debounced config event");
                return false;
            }
        }
        self.last_trigger = Some(now);
        true
    }
}

/// Canonicalize when possible; a vanished file keeps its literal path.
fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
