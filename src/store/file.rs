// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::StoreError;

use super::{Snapshot, SnapshotStore};

/// Snapshot stored as a pretty-printed JSON file.
///
/// Writes go to a `.partial` sibling first and are renamed over the target,
/// so a reader never sees a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".partial");
        PathBuf::from(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| StoreError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| StoreError::JsonParseFailed {
                path: self.path.clone(),
                source: e,
            })?;
        snapshot.check_version()?;

        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDirectoryFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let partial = self.partial_path();

        std::fs::write(&partial, json).map_err(|e| StoreError::WriteFailed {
            path: partial.clone(),
            source: e,
        })?;
        std::fs::rename(&partial, &self.path).map_err(|e| StoreError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Read a JSON object of string-keyed entries in the legacy layout.
///
/// Non-string values are kept as their JSON text.
pub fn read_legacy_entries(path: &Path) -> Result<HashMap<String, String>, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let entries: HashMap<String, Value> =
        serde_json::from_str(&content).map_err(|e| StoreError::JsonParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(entries
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => (key, text),
            other => (key, other.to_string()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Episode, ProgressRecord};
    use chrono::Utc;
    use tempfile::tempdir;

    fn make_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::empty(40);
        snapshot.current_episode = Some(Episode {
            episode_id: "10716-s1-e1".to_string(),
            audio_url: "https://example.com/ep.mp3".to_string(),
            title: "Pilot".to_string(),
            season: 1,
            episode: 1,
            show_title: "Test Show".to_string(),
            show_image: "https://example.com/show.jpg".to_string(),
        });
        snapshot.playback_history.insert(
            "10716-s1-e1".to_string(),
            ProgressRecord::checkpoint(30.0, 600.0, false, 0.95, Utc::now()),
        );
        snapshot
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        let snapshot = make_snapshot();

        store.save(&snapshot).unwrap();
        let read_back = store.load().unwrap().unwrap();

        assert_eq!(read_back, snapshot);
    }

    #[test]
    fn save_creates_parent_directories_and_leaves_no_partial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("podplay").join("state.json");
        let store = JsonFileStore::new(&path);

        store.save(&Snapshot::empty(70)).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested/podplay/state.json.partial").exists());
    }

    #[test]
    fn corrupt_file_reports_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ nope").unwrap();

        let result = JsonFileStore::new(&path).load();
        assert!(matches!(result, Err(StoreError::JsonParseFailed { .. })));
    }

    #[test]
    fn newer_version_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"version": 99, "volume": 70}"#).unwrap();

        let result = JsonFileStore::new(&path).load();
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn legacy_entries_accept_string_and_raw_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(
            &path,
            r#"{"audioVolume": "55", "recentlyPlayedEpisodes": []}"#,
        )
        .unwrap();

        let entries = read_legacy_entries(&path).unwrap();
        assert_eq!(entries["audioVolume"], "55");
        assert_eq!(entries["recentlyPlayedEpisodes"], "[]");

        let snapshot = Snapshot::from_legacy_entries(&entries, 70).unwrap();
        assert_eq!(snapshot.volume, 55);
    }
}
