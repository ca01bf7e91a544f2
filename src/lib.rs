// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod catalog;
pub mod error;
pub mod http;
pub mod player;
pub mod store;

// Re-export main types for convenience
pub use catalog::{DEFAULT_CATALOG_URL, Show, ShowPreview, fetch_catalog, fetch_show};
pub use error::{CatalogError, PlaybackError, StoreError};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use player::{
    EngineConfig, Episode, MediaElement, MediaEvent, NoopObserver, Phase, PlaybackEngine,
    PlaybackObserver, PlaybackState, PlayerEvent, ProgressRecord, SharedObserver, SimulatedMedia,
};
pub use store::{JsonFileStore, MemoryStore, Snapshot, SnapshotStore};
