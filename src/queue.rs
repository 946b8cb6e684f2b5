//! The insertion-ordered work queue shared by the dispatcher, both transfer
//! kinds, and the tree walkers.
//!
//! All mutation goes through one `Mutex`-guarded `Inner`, matching the
//! "serialize all queue mutations on a single logical actor" contract: every
//! public method here is a single atomic unit of work (e.g. "dequeue and add
//! to the failed set" happens under one lock acquisition, never two).

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::QueueError;

/// Per-path metadata as recovered from a saved folder description (Restore)
/// or as received in a live one (Backup, transiently, before being persisted).
pub type EntryMetadata = HashMap<String, String>;

/// Per-path queue state. `failures` only ever grows for the life of an
/// entry; `in_flight` toggles as transfers start and finish.
#[derive(Debug, Clone, Default)]
pub struct QueueEntry {
    pub in_flight: bool,
    pub failures: u32,
    pub metadata: Option<EntryMetadata>,
}

struct Inner {
    entries: IndexMap<String, QueueEntry>,
    failed: HashSet<String>,
    abandoned: bool,
}

pub struct WorkQueue {
    inner: Mutex<Inner>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: IndexMap::new(),
                failed: HashSet::new(),
                abandoned: false,
            }),
        }
    }

    #[allow(clippy::unwrap_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Adds `path` to the tail of the queue with the given metadata.
    ///
    /// If `path` is already present, the existing entry is left untouched
    /// (first-write-wins on metadata) and a warning is logged; this is a
    /// deliberate, preserved quirk, not a bug (see the crate's design notes).
    /// If the run has been abandoned, the call is a no-op and
    /// `QueueError::Abandoned` is returned.
    pub fn enqueue(&self, path: impl Into<String>, metadata: Option<EntryMetadata>) -> Result<(), QueueError> {
        let path = path.into();
        let mut inner = self.lock();
        if inner.abandoned {
            warn!(path = %path, "enqueue ignored: run abandoned");
            return Err(QueueError::Abandoned);
        }
        if inner.entries.contains_key(&path) {
            warn!(path = %path, "path already queued, ignoring re-enqueue");
            return Ok(());
        }
        inner.entries.insert(
            path,
            QueueEntry {
                in_flight: false,
                failures: 0,
                metadata,
            },
        );
        Ok(())
    }

    /// Removes `path` from the queue unconditionally. Returns the removed
    /// entry, if it was present.
    pub fn dequeue(&self, path: &str) -> Option<QueueEntry> {
        self.lock().entries.shift_remove(path)
    }

    /// Removes `path` from the queue and records it in the failed set. A
    /// no-op (but still records the failure) if the path wasn't queued.
    pub fn dequeue_as_failed(&self, path: &str) {
        let mut inner = self.lock();
        inner.entries.shift_remove(path);
        inner.failed.insert(path.to_string());
    }

    /// Removes then reinserts `path`, so it becomes the last entry. Leaves
    /// the entry's fields (failures, metadata) untouched; a no-op if `path`
    /// isn't queued.
    pub fn move_to_end(&self, path: &str) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.shift_remove(path) {
            inner.entries.insert(path.to_string(), entry);
        }
    }

    /// Marks `path` in-flight or not. No-op if `path` isn't queued.
    pub fn set_in_flight(&self, path: &str, in_flight: bool) {
        if let Some(entry) = self.lock().entries.get_mut(path) {
            entry.in_flight = in_flight;
        }
    }

    /// Increments `path`'s failure count and returns the new value. Returns
    /// `None` if `path` isn't queued (shouldn't happen in practice: the
    /// caller holds the path because it just ran a transfer on it).
    pub fn increment_failures(&self, path: &str) -> Option<u32> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(path)?;
        entry.failures += 1;
        Some(entry.failures)
    }

    /// Returns the first queued path that is not in-flight, in insertion
    /// order, together with the total number of in-flight entries.
    ///
    /// Read-only: does not mark anything in-flight. Kept for tests and
    /// diagnostics; the dispatcher must use `select_and_mark_in_flight`
    /// instead, since selecting and marking separately races under a
    /// multi-thread runtime (two callers can both see the same candidate
    /// before either marks it).
    pub fn first_not_in_flight(&self) -> (Option<String>, usize) {
        let inner = self.lock();
        let in_flight = inner.entries.values().filter(|e| e.in_flight).count();
        let candidate = inner
            .entries
            .iter()
            .find(|(_, entry)| !entry.in_flight)
            .map(|(path, _)| path.clone());
        (candidate, in_flight)
    }

    /// Atomically selects the first not-in-flight path and marks it
    /// in-flight, under one lock acquisition - the dispatcher's single
    /// suspension-free "scan once, start at most one transfer" step.
    ///
    /// Returns `None` if the in-flight count is already at or above
    /// `simultaneous` (without marking anything), or if every queued path is
    /// already in-flight. Otherwise returns the selected path together with
    /// the in-flight count as it was *before* this selection, so the caller
    /// can decide whether to ramp up further (`in_flight + 1 < simultaneous`).
    pub fn select_and_mark_in_flight(&self, simultaneous: usize) -> Option<(String, usize)> {
        let mut inner = self.lock();
        let in_flight = inner.entries.values().filter(|e| e.in_flight).count();
        if in_flight >= simultaneous {
            return None;
        }
        let candidate = inner
            .entries
            .iter()
            .find(|(_, entry)| !entry.in_flight)
            .map(|(path, _)| path.clone())?;
        if let Some(entry) = inner.entries.get_mut(&candidate) {
            entry.in_flight = true;
        }
        Some((candidate, in_flight))
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().entries.contains_key(path)
    }

    pub fn entry_snapshot(&self, path: &str) -> Option<QueueEntry> {
        self.lock().entries.get(path).cloned()
    }

    /// All currently-queued paths, in order. Intended for tests and for
    /// logging remaining work at abandonment/hard-exit.
    pub fn queued_paths(&self) -> Vec<String> {
        self.lock().entries.keys().cloned().collect()
    }

    pub fn failed_paths(&self) -> Vec<String> {
        self.lock().failed.iter().cloned().collect()
    }

    pub fn failed_count(&self) -> usize {
        self.lock().failed.len()
    }

    pub fn is_abandoned(&self) -> bool {
        self.lock().abandoned
    }

    /// Enters graceful abandonment: sets the flag and removes every
    /// not-in-flight entry, moving it to the failed set. In-flight entries
    /// are left alone so their transfers can finish naturally.
    pub fn abandon(&self) {
        let mut inner = self.lock();
        inner.abandoned = true;
        let to_remove: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.in_flight)
            .map(|(path, _)| path.clone())
            .collect();
        for path in to_remove {
            inner.entries.shift_remove(&path);
            inner.failed.insert(path);
        }
    }
}
