// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod file;
mod memory;
mod snapshot;

pub use file::{JsonFileStore, read_legacy_entries};
pub use memory::MemoryStore;
pub use snapshot::{
    LEGACY_CURRENT_EPISODE_KEY, LEGACY_HISTORY_KEY, LEGACY_RECENTLY_PLAYED_KEY, LEGACY_VOLUME_KEY,
    SNAPSHOT_VERSION, Snapshot,
};

use crate::error::StoreError;

/// Persistence for the engine's snapshot.
///
/// A snapshot is always read and written as a whole. Concurrent writers are
/// not coordinated; the last write wins.
pub trait SnapshotStore {
    /// Load the stored snapshot, `None` if nothing was saved yet
    fn load(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        (**self).save(snapshot)
    }
}
