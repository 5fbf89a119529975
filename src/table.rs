// src/table.rs
//! Shared cache table: the concurrently readable name→handle store.

use std::sync::Arc;

use dashmap::DashMap;

use crate::worker::WorkerHandle;

/// Concurrent map of names to live worker handles.
///
/// Many readers may resolve names while the single writer (the coordinator)
/// inserts and deletes; each entry is published atomically, so a reader sees
/// either a whole entry or none. Readers may observe a slightly stale
/// snapshot, never a torn one.
pub struct CacheTable {
    entries: DashMap<String, WorkerHandle>,
}

/// Shareable reference to a table. The table is owned by whichever long-lived
/// component created it; a coordinator only ever holds a non-owning clone and
/// may be restarted against a table that still carries entries from its
/// previous incarnation.
pub type TableRef = Arc<CacheTable>;

impl CacheTable {
    /// Create a new, empty table.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Create a new, empty table already wrapped for sharing. The caller is
    /// the owner; coordinators and readers get clones of the `Arc`.
    pub fn shared() -> TableRef {
        Arc::new(Self::new())
    }

    /// Insert or replace the handle registered under `name`.
    pub fn insert(&self, name: String, handle: WorkerHandle) {
        self.entries.insert(name, handle);
    }

    /// Resolve a name. `None` covers both never-registered and evicted.
    pub fn lookup(&self, name: &str) -> Option<WorkerHandle> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    /// Remove a name mapping.
    pub fn delete(&self, name: &str) {
        self.entries.remove(name);
    }

    /// Visit every entry. Used by a freshly constructed coordinator to
    /// re-register watches on inherited entries.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &WorkerHandle),
    {
        for entry in self.entries.iter() {
            f(entry.key(), entry.value());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `name` directly against the table, bypassing the coordinator.
///
/// This is the whole lookup path: a pure read, safe from arbitrarily many
/// threads while the coordinator is writing, and it never blocks on the
/// coordinator.
pub fn lookup(table: &TableRef, name: &str) -> Option<WorkerHandle> {
    table.lookup(name)
}
