// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StoreError;
use crate::player::{Episode, PlaybackHistory, ProgressRecord};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Keys of the older layout that stored every field as a separate string entry
pub const LEGACY_VOLUME_KEY: &str = "audioVolume";
pub const LEGACY_HISTORY_KEY: &str = "playbackHistory";
pub const LEGACY_CURRENT_EPISODE_KEY: &str = "currentEpisode";
pub const LEGACY_RECENTLY_PLAYED_KEY: &str = "recentlyPlayedEpisodes";

/// Everything the engine persists, read and written as one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub volume: u8,
    #[serde(default)]
    pub playback_history: PlaybackHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_episode: Option<Episode>,
    #[serde(default)]
    pub recently_played: Vec<Episode>,
}

impl Snapshot {
    /// Empty snapshot with the given volume
    pub fn empty(volume: u8) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            volume: volume.min(100),
            playback_history: PlaybackHistory::new(),
            current_episode: None,
            recently_played: Vec::new(),
        }
    }

    /// Reject snapshots written by a newer format
    pub fn check_version(&self) -> Result<(), StoreError> {
        if self.version > SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }

    /// Import the string-keyed layout, one JSON-encoded value per key.
    ///
    /// Missing keys fall back to defaults, `default_volume` included.
    pub fn from_legacy_entries(
        entries: &HashMap<String, String>,
        default_volume: u8,
    ) -> Result<Self, StoreError> {
        let mut snapshot = Self::empty(default_volume);

        if let Some(raw) = entries.get(LEGACY_VOLUME_KEY) {
            snapshot.volume =
                leading_volume(raw).ok_or_else(|| StoreError::MalformedLegacyEntry {
                    key: LEGACY_VOLUME_KEY.to_string(),
                    reason: format!("no leading integer in {raw:?}"),
                })?;
        }

        if let Some(history) =
            parse_legacy::<BTreeMap<String, LegacyProgressRecord>>(entries, LEGACY_HISTORY_KEY)?
        {
            snapshot.playback_history = history
                .into_iter()
                .map(|(id, record)| (id, record.into()))
                .collect();
        }
        if let Some(episode) = parse_legacy(entries, LEGACY_CURRENT_EPISODE_KEY)? {
            snapshot.current_episode = Some(episode);
        }
        if let Some(recent) = parse_legacy(entries, LEGACY_RECENTLY_PLAYED_KEY)? {
            snapshot.recently_played = recent;
        }

        Ok(snapshot)
    }
}

/// Progress record as the older layout wrote it; unknown times were stored as `null`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProgressRecord {
    #[serde(default, deserialize_with = "lenient_seconds")]
    current_time: f64,
    #[serde(default, deserialize_with = "lenient_seconds")]
    duration: f64,
    #[serde(default)]
    completed: bool,
    last_listened: DateTime<Utc>,
}

impl From<LegacyProgressRecord> for ProgressRecord {
    fn from(legacy: LegacyProgressRecord) -> Self {
        Self {
            current_time: legacy.current_time,
            duration: legacy.duration,
            completed: legacy.completed,
            last_listened: legacy.last_listened,
        }
    }
}

fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let seconds = Option::<f64>::deserialize(deserializer)?;
    Ok(seconds.filter(|s| s.is_finite() && *s >= 0.0).unwrap_or(0.0))
}

/// Volume read like the older layout did: the leading integer, clamped to 0..=100
fn leading_volume(raw: &str) -> Option<u8> {
    let raw = raw.trim_start();
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return None;
    }
    if negative {
        return Some(0);
    }

    let value = digits.parse::<u64>().unwrap_or(u64::MAX).min(100);
    u8::try_from(value).ok()
}

fn parse_legacy<T: DeserializeOwned>(
    entries: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(raw) = entries.get(key) else {
        return Ok(None);
    };

    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| StoreError::MalformedLegacyEntry {
            key: key.to_string(),
            reason: e.to_string(),
        })
}
