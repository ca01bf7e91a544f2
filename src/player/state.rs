// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single playable audio unit belonging to a show and season
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub episode_id: String,
    pub audio_url: String,
    pub title: String,
    pub season: u32,
    pub episode: u32,
    pub show_title: String,
    pub show_image: String,
}

/// Lifecycle phase of the engine's single media slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No source attached
    #[default]
    Idle,
    /// Source assigned, waiting for metadata
    Loading,
    Playing,
    Paused,
    /// Reached end of track
    Ended,
}

/// Observable playback state, mutated only by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub phase: Phase,
    pub current_episode: Option<Episode>,
    pub is_playing: bool,
    /// Playback position in seconds
    pub current_time: f64,
    /// Track duration in seconds, zero until metadata is known
    pub duration: f64,
    /// Volume as an integer percentage (0-100)
    pub volume: u8,
    pub is_repeat_active: bool,
    /// Advisory only, consumed by whoever picks the next episode
    pub is_shuffle_active: bool,
}

impl PlaybackState {
    pub fn new(volume: u8) -> Self {
        Self {
            phase: Phase::Idle,
            current_episode: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: volume.min(100),
            is_repeat_active: false,
            is_shuffle_active: false,
        }
    }

    /// Id of the loaded episode, if any
    pub fn episode_id(&self) -> Option<&str> {
        self.current_episode.as_ref().map(|e| e.episode_id.as_str())
    }
}

/// Persisted playback checkpoint for one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub current_time: f64,
    pub duration: f64,
    pub completed: bool,
    pub last_listened: DateTime<Utc>,
}

impl ProgressRecord {
    /// Build a checkpoint at `time`.
    ///
    /// The record counts as completed when `completed` is passed explicitly or
    /// when `time` reaches `threshold` of a known duration.
    pub fn checkpoint(
        time: f64,
        duration: f64,
        completed: bool,
        threshold: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let reached_threshold = duration > 0.0 && time >= duration * threshold;

        Self {
            current_time: time,
            duration,
            completed: completed || reached_threshold,
            last_listened: now,
        }
    }

    /// Position to resume from, `None` if playback should start at the top.
    ///
    /// Completed records start over; resuming at the end would finish (and
    /// with repeat on, restart) immediately.
    pub fn resume_position(&self) -> Option<f64> {
        (!self.completed && self.current_time > 0.0).then_some(self.current_time)
    }
}

/// Progress records keyed by episode id
pub type PlaybackHistory = BTreeMap<String, ProgressRecord>;

/// Bounded, deduplicated, most-recent-first list of played episodes
#[derive(Debug, Clone, PartialEq)]
pub struct RecentlyPlayed {
    entries: Vec<Episode>,
    limit: usize,
}

impl RecentlyPlayed {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    /// Rebuild from persisted entries, enforcing dedup and the cap
    pub fn from_entries(entries: Vec<Episode>, limit: usize) -> Self {
        let mut recent = Self::new(limit);
        // Oldest first so the persisted head ends up at the front again
        for episode in entries.into_iter().rev() {
            recent.push(episode);
        }
        recent
    }

    /// Move `episode` to the front, dropping any older entry with the same id
    pub fn push(&mut self, episode: Episode) {
        self.entries.retain(|e| e.episode_id != episode.episode_id);
        self.entries.insert(0, episode);
        self.entries.truncate(self.limit);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[Episode] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Episode> {
        self.entries.clone()
    }
}

#[cfg(test)]
pub(crate) fn make_episode(id: &str) -> Episode {
    Episode {
        episode_id: id.to_string(),
        audio_url: format!("https://example.com/{id}.mp3"),
        title: format!("Episode {id}"),
        season: 1,
        episode: 1,
        show_title: "Test Show".to_string(),
        show_image: "https://example.com/show.jpg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_completion_boundary() {
        let now = Utc::now();
        let duration = 200.0;

        let at_threshold = ProgressRecord::checkpoint(0.95 * duration, duration, false, 0.95, now);
        let below = ProgressRecord::checkpoint(0.94999 * duration, duration, false, 0.95, now);

        assert!(at_threshold.completed);
        assert!(!below.completed);
    }

    #[test]
    fn explicit_completion_wins() {
        let record = ProgressRecord::checkpoint(10.0, 200.0, true, 0.95, Utc::now());
        assert!(record.completed);
    }

    #[test]
    fn unknown_duration_never_completes_implicitly() {
        let record = ProgressRecord::checkpoint(3.0, 0.0, false, 0.95, Utc::now());
        assert!(!record.completed);
    }

    #[test]
    fn resume_position_skips_completed_and_zero() {
        let now = Utc::now();
        assert_eq!(
            ProgressRecord::checkpoint(42.0, 200.0, false, 0.95, now).resume_position(),
            Some(42.0)
        );
        assert_eq!(
            ProgressRecord::checkpoint(0.0, 200.0, false, 0.95, now).resume_position(),
            None
        );
        assert_eq!(
            ProgressRecord::checkpoint(199.0, 200.0, false, 0.95, now).resume_position(),
            None
        );
    }

    #[test]
    fn recently_played_deduplicates_and_moves_to_front() {
        let mut recent = RecentlyPlayed::new(10);
        recent.push(make_episode("a"));
        recent.push(make_episode("b"));
        recent.push(make_episode("a"));

        let ids: Vec<_> = recent.entries().iter().map(|e| e.episode_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn recently_played_is_capped() {
        let mut recent = RecentlyPlayed::new(3);
        for id in ["a", "b", "c", "d"] {
            recent.push(make_episode(id));
        }

        let ids: Vec<_> = recent.entries().iter().map(|e| e.episode_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "b"]);
    }

    #[test]
    fn from_entries_preserves_order_and_applies_cap() {
        let entries = vec![
            make_episode("c"),
            make_episode("b"),
            make_episode("c"),
            make_episode("a"),
        ];
        let recent = RecentlyPlayed::from_entries(entries, 2);

        let ids: Vec<_> = recent.entries().iter().map(|e| e.episode_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn episode_serializes_camel_case() {
        let json = serde_json::to_value(make_episode("x")).unwrap();
        assert_eq!(json["episodeId"], "x");
        assert_eq!(json["audioUrl"], "https://example.com/x.mp3");
        assert_eq!(json["showTitle"], "Test Show");
    }
}
