// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Media event handling as pure functions.
//!
//! `on_media_event` never touches the media backend or the store. It returns
//! the next state together with the side effects the engine has to carry out,
//! in order.

use std::time::Duration;

use crate::error::PlaybackError;

use super::media::{MediaEvent, PlayRequestId};
use super::state::{Episode, PlaybackState, Phase};

/// Inputs a transition needs beyond the state itself
#[derive(Debug, Clone, Default)]
pub struct TransitionContext {
    /// Saved resume offset for the loaded episode
    pub resume_position: Option<f64>,
    /// The start request the engine is currently waiting on
    pub pending_request: Option<PlayRequestId>,
    /// No metadata has arrived yet for the attached source
    pub awaiting_metadata: bool,
    pub checkpoint_interval_secs: u32,
    pub repeat_delay: Duration,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Move the media position before playback starts
    RestorePosition(f64),
    /// Issue a new start request
    StartPlayback,
    /// The pending start request resolved
    PlaybackStarted { episode_id: String },
    /// Write a progress record for the loaded episode
    Checkpoint { position: f64, completed: bool },
    /// Replay `episode` after `delay`
    ScheduleRepeat { episode: Episode, delay: Duration },
    /// Report a failure; the engine logs it and notifies observers
    Failed(PlaybackError),
}

/// Result of applying one media event
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: PlaybackState,
    pub effects: Vec<Effect>,
}

impl Step {
    fn unchanged(state: &PlaybackState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }
}

/// Compute the state following `event`
pub fn on_media_event(
    state: &PlaybackState,
    event: &MediaEvent,
    context: &TransitionContext,
) -> Step {
    match event {
        MediaEvent::MetadataLoaded { duration } => metadata_loaded(state, *duration, context),
        MediaEvent::TimeUpdated { position } => time_updated(state, *position, context),
        MediaEvent::PlayStarted { request } => play_started(state, *request, context),
        MediaEvent::PlayRejected { request, reason } => {
            if context.pending_request != Some(*request) {
                return Step::unchanged(state);
            }
            let episode_id = state.episode_id().unwrap_or_default().to_string();
            failed(
                state,
                PlaybackError::StartRejected {
                    episode_id,
                    reason: reason.clone(),
                },
            )
        }
        MediaEvent::Ended => ended(state, context),
        MediaEvent::Error { message } => {
            let episode_id = state.episode_id().unwrap_or_default().to_string();
            failed(
                state,
                PlaybackError::Media {
                    episode_id,
                    message: message.clone(),
                },
            )
        }
    }
}

fn metadata_loaded(state: &PlaybackState, duration: f64, context: &TransitionContext) -> Step {
    let mut next = state.clone();
    next.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };

    if !context.awaiting_metadata {
        return Step {
            state: next,
            effects: Vec::new(),
        };
    }

    // A start issued while loading may already be running; the saved offset
    // still applies to the first metadata of the source.
    let mut effects = Vec::new();
    if let Some(offset) = context.resume_position {
        let offset = offset.min(next.duration);
        next.current_time = offset;
        effects.push(Effect::RestorePosition(offset));
    }

    if state.phase == Phase::Loading {
        next.phase = Phase::Paused;
        effects.push(Effect::StartPlayback);
    }

    Step {
        state: next,
        effects,
    }
}

fn time_updated(state: &PlaybackState, position: f64, context: &TransitionContext) -> Step {
    let mut next = state.clone();
    next.current_time = position;

    let mut effects = Vec::new();
    if state.phase == Phase::Playing
        && state.current_episode.is_some()
        && crossed_checkpoint(state.current_time, position, context.checkpoint_interval_secs)
    {
        effects.push(Effect::Checkpoint {
            position,
            completed: false,
        });
    }

    Step {
        state: next,
        effects,
    }
}

fn play_started(state: &PlaybackState, request: PlayRequestId, context: &TransitionContext) -> Step {
    if context.pending_request != Some(request) {
        return Step::unchanged(state);
    }
    let Some(episode_id) = state.episode_id().map(String::from) else {
        return Step::unchanged(state);
    };

    let mut next = state.clone();
    next.phase = Phase::Playing;
    next.is_playing = true;

    Step {
        state: next,
        effects: vec![Effect::PlaybackStarted { episode_id }],
    }
}

fn ended(state: &PlaybackState, context: &TransitionContext) -> Step {
    let mut next = state.clone();
    next.is_playing = false;

    let Some(episode) = state.current_episode.clone() else {
        next.phase = Phase::Idle;
        return Step {
            state: next,
            effects: Vec::new(),
        };
    };

    next.phase = Phase::Ended;
    if state.duration > 0.0 {
        next.current_time = state.duration;
    }

    let mut effects = vec![Effect::Checkpoint {
        position: state.duration,
        completed: true,
    }];
    if state.is_repeat_active {
        effects.push(Effect::ScheduleRepeat {
            episode,
            delay: context.repeat_delay,
        });
    }

    Step {
        state: next,
        effects,
    }
}

fn failed(state: &PlaybackState, error: PlaybackError) -> Step {
    let mut next = state.clone();
    next.is_playing = false;
    next.phase = if state.current_episode.is_some() {
        Phase::Paused
    } else {
        Phase::Idle
    };

    Step {
        state: next,
        effects: vec![Effect::Failed(error)],
    }
}

/// Whether moving from `previous` to `position` crosses a multiple of `interval` whole seconds
pub fn crossed_checkpoint(previous: f64, position: f64, interval: u32) -> bool {
    if interval == 0 || !position.is_finite() || !previous.is_finite() {
        return false;
    }
    let interval = f64::from(interval);
    (position / interval).floor() > (previous / interval).floor()
}
