// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::PlaybackError;
use crate::store::{SNAPSHOT_VERSION, Snapshot, SnapshotStore};

use super::config::EngineConfig;
use super::media::{MediaElement, MediaEvent, PlayRequestId, PlayStart};
use super::observer::{Observers, PlayerEvent, SharedObserver, SubscriptionId};
use super::state::{
    Episode, PlaybackHistory, PlaybackState, Phase, ProgressRecord, RecentlyPlayed,
};
use super::transition::{Effect, Step, TransitionContext, on_media_event};

/// Deferred restart of a repeating episode
#[derive(Debug, Clone)]
struct RepeatTimer {
    deadline: Instant,
    episode: Episode,
}

/// Owns the single media slot and everything persisted about playback.
///
/// All methods run on the caller's thread. Media events are fed in through
/// `handle_media_event` (or `pump`, which drains the backend), and timers are
/// driven with `next_deadline` and `fire_due_timers`.
pub struct PlaybackEngine<M, S> {
    media: M,
    store: S,
    config: EngineConfig,
    state: PlaybackState,
    history: PlaybackHistory,
    recently_played: RecentlyPlayed,
    observers: Observers,
    pending_request: Option<PlayRequestId>,
    awaiting_metadata: bool,
    next_request: u64,
    repeat_timer: Option<RepeatTimer>,
    degraded: bool,
}

impl<M: MediaElement, S: SnapshotStore> PlaybackEngine<M, S> {
    /// Create an engine, restoring whatever `store` holds.
    ///
    /// A failing store is logged and the engine starts from defaults.
    pub fn new(media: M, store: S, config: EngineConfig) -> Self {
        let snapshot = match store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => Snapshot::empty(config.default_volume),
            Err(e) => {
                warn!(error = %e, operation = "load", "Failed to restore playback state, starting empty");
                Snapshot::empty(config.default_volume)
            }
        };

        let mut state = PlaybackState::new(snapshot.volume);
        state.current_episode = snapshot.current_episode;
        let recently_played =
            RecentlyPlayed::from_entries(snapshot.recently_played, config.recently_played_limit);

        let mut engine = Self {
            media,
            store,
            config,
            state,
            history: snapshot.playback_history,
            recently_played,
            observers: Observers::default(),
            pending_request: None,
            awaiting_metadata: false,
            next_request: 0,
            repeat_timer: None,
            degraded: false,
        };
        engine.apply_gain();
        engine
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn playback_history(&self) -> &PlaybackHistory {
        &self.history
    }

    /// Recently played episodes, most recent first
    pub fn recently_played(&self) -> &[Episode] {
        self.recently_played.entries()
    }

    /// Whether the last persistence write failed
    pub fn is_persistence_degraded(&self) -> bool {
        self.degraded
    }

    pub fn subscribe(&mut self, observer: SharedObserver) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Stop whatever is playing and load `episode`.
    ///
    /// Playback starts once the backend reports metadata.
    pub fn play_episode(&mut self, episode: Episode) {
        self.media.pause();
        self.repeat_timer = None;
        self.pending_request = None;
        self.awaiting_metadata = false;

        info!(episode_id = %episode.episode_id, title = %episode.title, "Loading episode");

        self.state.current_episode = Some(episode.clone());
        self.state.phase = Phase::Loading;
        self.state.is_playing = false;
        self.state.current_time = 0.0;
        self.state.duration = 0.0;

        self.recently_played.push(episode.clone());
        self.persist();
        self.publish_recently_played();

        match Url::parse(&episode.audio_url) {
            Ok(url) => {
                self.media.set_source(&url);
                self.awaiting_metadata = true;
                self.media.load();
            }
            Err(_) => {
                self.state.phase = Phase::Paused;
                self.report_failure(PlaybackError::InvalidSource {
                    episode_id: episode.episode_id,
                    url: episode.audio_url,
                });
            }
        }

        self.publish_state();
    }

    /// Pause when playing, start otherwise. Does nothing without an episode.
    pub fn toggle_play_pause(&mut self) {
        let Some(episode) = self.state.current_episode.clone() else {
            return;
        };

        if self.state.phase == Phase::Idle {
            // Restored from a previous session, nothing attached yet
            self.play_episode(episode);
            return;
        }

        if self.state.is_playing {
            self.media.pause();
            self.pending_request = None;
            self.state.is_playing = false;
            self.state.phase = Phase::Paused;
        } else {
            if self.state.phase == Phase::Ended {
                self.repeat_timer = None;
                self.media.set_position(0.0);
                self.state.current_time = 0.0;
            }
            self.request_start();
        }

        self.publish_state();
    }

    /// Jump to `time` seconds and checkpoint immediately
    pub fn seek_to(&mut self, time: f64) {
        if !time.is_finite() {
            warn!(time, operation = "seek", "Ignoring non-finite seek target");
            return;
        }

        self.media.set_position(time);
        self.state.current_time = time;
        self.save_progress(time, false);
        self.publish_state();
    }

    /// Seek ahead by `seconds` (the configured skip distance if `None`), stopping at the end
    pub fn skip_forward(&mut self, seconds: impl Into<Option<f64>>) {
        let seconds = seconds.into().unwrap_or(self.config.skip_seconds);
        let target = self.media.position() + seconds;
        self.seek_to(self.clamp_to_duration(target));
    }

    /// Seek back by `seconds` (the configured skip distance if `None`), stopping at zero
    pub fn skip_backward(&mut self, seconds: impl Into<Option<f64>>) {
        let seconds = seconds.into().unwrap_or(self.config.skip_seconds);
        let target = self.media.position() - seconds;
        self.seek_to(self.clamp_to_duration(target));
    }

    pub fn toggle_repeat(&mut self) {
        self.state.is_repeat_active = !self.state.is_repeat_active;
        if !self.state.is_repeat_active {
            self.repeat_timer = None;
        }
        self.publish_state();
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.is_shuffle_active = !self.state.is_shuffle_active;
        self.publish_state();
    }

    /// Set the volume percentage; values above 100 are clamped
    pub fn set_volume(&mut self, percent: u8) {
        self.state.volume = percent.min(100);
        self.apply_gain();
        self.persist();
        self.publish_state();
    }

    /// Write a progress record for the loaded episode.
    ///
    /// The record counts as completed if `completed` is set or `time` reaches
    /// the completion threshold.
    pub fn save_progress(&mut self, time: f64, completed: bool) {
        let Some(episode_id) = self.state.episode_id().map(String::from) else {
            return;
        };

        // Before metadata arrives the stored record still knows the length
        let duration = if self.state.duration > 0.0 {
            self.state.duration
        } else {
            self.history.get(&episode_id).map_or(0.0, |r| r.duration)
        };

        let record = ProgressRecord::checkpoint(
            time,
            duration,
            completed,
            self.config.completion_threshold,
            Utc::now(),
        );
        debug!(episode_id = %episode_id, time, completed = record.completed, "Saving progress");

        self.history.insert(episode_id.clone(), record.clone());
        self.persist();
        self.observers
            .notify(&PlayerEvent::ProgressSaved { episode_id, record });
    }

    pub fn get_episode_progress(&self, episode_id: &str) -> Option<&ProgressRecord> {
        self.history.get(episode_id)
    }

    /// Register `episode` at the front of the recently played list
    pub fn track_recently_played(&mut self, episode: Episode) {
        self.recently_played.push(episode);
        self.persist();
        self.publish_recently_played();
    }

    /// Pause and rewind to zero, keeping the loaded episode
    pub fn stop_playback(&mut self) {
        self.media.pause();
        self.media.set_position(0.0);
        self.pending_request = None;
        self.repeat_timer = None;

        self.state.is_playing = false;
        self.state.current_time = 0.0;
        if self.state.current_episode.is_some() && self.state.phase != Phase::Idle {
            self.state.phase = Phase::Paused;
        }

        self.publish_state();
    }

    /// Forget all progress records and the recently played list
    pub fn reset_history(&mut self) {
        info!("Resetting playback history");
        self.history.clear();
        self.recently_played.clear();
        self.persist();
        self.observers.notify(&PlayerEvent::HistoryCleared);
        self.publish_recently_played();
    }

    pub fn clear_recently_played(&mut self) {
        self.recently_played.clear();
        self.persist();
        self.publish_recently_played();
    }

    /// Drain the media backend and process its events in order
    pub fn pump(&mut self, elapsed: Duration) {
        for event in self.media.poll(elapsed) {
            self.handle_media_event(event);
        }
    }

    /// Apply one media event
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let before = self.state.clone();
        self.apply_event(event);
        if self.state != before {
            self.publish_state();
        }
    }

    /// When the next timer is due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.repeat_timer.as_ref().map(|timer| timer.deadline)
    }

    /// Run timers that are due at `now`
    pub fn fire_due_timers(&mut self, now: Instant) {
        if let Some(timer) = self.repeat_timer.take_if(|timer| timer.deadline <= now) {
            info!(episode_id = %timer.episode.episode_id, "Repeating episode");
            self.play_episode(timer.episode);
        }
    }

    /// Current persisted view of the engine
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            volume: self.state.volume,
            playback_history: self.history.clone(),
            current_episode: self.state.current_episode.clone(),
            recently_played: self.recently_played.to_vec(),
        }
    }

    fn apply_event(&mut self, event: MediaEvent) {
        let context = TransitionContext {
            resume_position: self.resume_position(),
            pending_request: self.pending_request,
            awaiting_metadata: self.awaiting_metadata,
            checkpoint_interval_secs: self.config.checkpoint_interval_secs,
            repeat_delay: self.config.repeat_delay,
        };

        let Step { state, effects } = on_media_event(&self.state, &event, &context);
        debug!(?event, phase = ?state.phase, "Media event");
        self.state = state;
        if matches!(event, MediaEvent::MetadataLoaded { .. }) {
            self.awaiting_metadata = false;
        }

        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RestorePosition(position) => {
                debug!(position, "Restoring saved position");
                self.media.set_position(position);
            }
            Effect::StartPlayback => self.request_start(),
            Effect::PlaybackStarted { episode_id } => {
                self.pending_request = None;
                info!(episode_id = %episode_id, "Playback started");
                self.observers
                    .notify(&PlayerEvent::PlaybackStarted { episode_id });
            }
            Effect::Checkpoint { position, completed } => self.save_progress(position, completed),
            Effect::ScheduleRepeat { episode, delay } => {
                debug!(episode_id = %episode.episode_id, ?delay, "Scheduling repeat");
                self.repeat_timer = Some(RepeatTimer {
                    deadline: Instant::now() + delay,
                    episode,
                });
            }
            Effect::Failed(error) => {
                self.pending_request = None;
                self.report_failure(error);
            }
        }
    }

    fn request_start(&mut self) {
        self.next_request += 1;
        let request = PlayRequestId(self.next_request);
        self.pending_request = Some(request);

        match self.media.play(request) {
            PlayStart::Started => self.apply_event(MediaEvent::PlayStarted { request }),
            PlayStart::Deferred => debug!(?request, "Waiting for playback to start"),
            PlayStart::Rejected(reason) => {
                self.apply_event(MediaEvent::PlayRejected { request, reason })
            }
        }
    }

    fn report_failure(&mut self, error: PlaybackError) {
        self.state.is_playing = false;
        warn!(
            episode_id = %error.episode_id(),
            operation = error.operation(),
            error = %error,
            "Playback failed"
        );
        self.observers
            .notify(&PlayerEvent::PlaybackFailed { error });
    }

    fn resume_position(&self) -> Option<f64> {
        self.state
            .episode_id()
            .and_then(|id| self.history.get(id))
            .and_then(ProgressRecord::resume_position)
    }

    fn clamp_to_duration(&self, target: f64) -> f64 {
        target.clamp(0.0, self.state.duration.max(0.0))
    }

    fn apply_gain(&mut self) {
        self.media.set_gain(f64::from(self.state.volume) / 100.0);
    }

    fn persist(&mut self) {
        let snapshot = self.snapshot();

        match self.store.save(&snapshot) {
            Ok(()) => {
                if self.degraded {
                    info!("Persistence recovered");
                    self.degraded = false;
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    episode_id = ?self.state.episode_id(),
                    operation = "persist",
                    "Failed to persist playback state, keeping it in memory"
                );
                if !self.degraded {
                    self.degraded = true;
                    self.observers.notify(&PlayerEvent::PersistenceDegraded {
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    fn publish_state(&self) {
        self.observers
            .notify(&PlayerEvent::StateChanged(self.state.clone()));
    }

    fn publish_recently_played(&self) {
        let episode_ids = self
            .recently_played
            .entries()
            .iter()
            .map(|episode| episode.episode_id.clone())
            .collect();
        self.observers
            .notify(&PlayerEvent::RecentlyPlayedChanged { episode_ids });
    }
}
