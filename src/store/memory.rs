// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::StoreError;

use super::{Snapshot, SnapshotStore};

#[derive(Debug, Default)]
struct Inner {
    snapshot: Mutex<Option<Snapshot>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

/// In-process snapshot store.
///
/// Clones share the same slot, so a caller can keep a handle to inspect what
/// the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        *store.lock() = Some(snapshot);
        store
    }

    /// Make every load and save fail, as if storage were unavailable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The last successfully saved snapshot
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.lock().clone()
    }

    /// Number of successful saves
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Snapshot>> {
        // A poisoned slot still holds a complete snapshot
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        self.check_available()?;
        Ok(self.lock().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.check_available()?;
        *self.lock() = Some(snapshot.clone());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_slot() {
        let store = MemoryStore::new();
        let handle = store.clone();

        store.save(&Snapshot::empty(20)).unwrap();

        assert_eq!(handle.snapshot().map(|s| s.volume), Some(20));
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn unavailable_store_fails_both_ways() {
        let store = MemoryStore::with_snapshot(Snapshot::empty(20));
        store.set_unavailable(true);

        assert!(store.load().is_err());
        assert!(store.save(&Snapshot::empty(30)).is_err());
        assert_eq!(store.snapshot().map(|s| s.volume), Some(20));
    }
}
