// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::VecDeque;
use std::time::Duration;

use url::Url;

/// Identifies one attempt to start playback.
///
/// Completions carrying an older id than the engine's pending request are
/// stale and get ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayRequestId(pub u64);

/// Immediate answer of the media backend to a start request
#[derive(Debug, Clone, PartialEq)]
pub enum PlayStart {
    /// Playback is running
    Started,
    /// The outcome arrives later as `MediaEvent::PlayStarted` or `MediaEvent::PlayRejected`
    Deferred,
    /// Playback was refused
    Rejected(String),
}

/// Events emitted by the media backend
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration of the attached source is known
    MetadataLoaded { duration: f64 },
    /// Position advanced
    TimeUpdated { position: f64 },
    /// A deferred start resolved
    PlayStarted { request: PlayRequestId },
    /// A deferred start failed
    PlayRejected {
        request: PlayRequestId,
        reason: String,
    },
    /// Playback reached the end of the source
    Ended,
    /// The source could not be loaded or decoded
    Error { message: String },
}

/// The single audio output the engine drives.
///
/// Implementations queue their events and hand them out from `poll`, so the
/// engine processes them one at a time on its own thread.
pub trait MediaElement {
    /// Attach a new source, replacing the previous one
    fn set_source(&mut self, url: &Url);

    /// Begin loading the attached source
    fn load(&mut self);

    /// Ask the backend to start or resume playback
    fn play(&mut self, request: PlayRequestId) -> PlayStart;

    fn pause(&mut self);

    /// Current position in seconds
    fn position(&self) -> f64;

    fn set_position(&mut self, seconds: f64);

    /// Output gain in the range 0.0 to 1.0
    fn set_gain(&mut self, gain: f64);

    /// Drain events that happened during `elapsed`
    fn poll(&mut self, elapsed: Duration) -> Vec<MediaEvent>;
}

/// Media backend that plays on a virtual clock instead of a sound device.
///
/// Every source reports the same configured duration.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    duration: f64,
    source: Option<Url>,
    playing: bool,
    position: f64,
    gain: f64,
    queued: VecDeque<MediaEvent>,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            source: None,
            playing: false,
            position: 0.0,
            gain: 1.0,
            queued: VecDeque::new(),
        }
    }

    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl MediaElement for SimulatedMedia {
    fn set_source(&mut self, url: &Url) {
        self.source = Some(url.clone());
        self.playing = false;
        self.position = 0.0;
        self.queued.clear();
    }

    fn load(&mut self) {
        if self.source.is_some() {
            self.queued.push_back(MediaEvent::MetadataLoaded {
                duration: self.duration,
            });
        } else {
            self.queued.push_back(MediaEvent::Error {
                message: "no source attached".to_string(),
            });
        }
    }

    fn play(&mut self, _request: PlayRequestId) -> PlayStart {
        if self.source.is_none() {
            return PlayStart::Rejected("no source attached".to_string());
        }
        if self.position >= self.duration {
            self.position = 0.0;
        }
        self.playing = true;
        PlayStart::Started
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
    }

    fn set_gain(&mut self, gain: f64) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    fn poll(&mut self, elapsed: Duration) -> Vec<MediaEvent> {
        let mut events: Vec<_> = self.queued.drain(..).collect();

        if self.playing {
            self.position = (self.position + elapsed.as_secs_f64()).min(self.duration);
            events.push(MediaEvent::TimeUpdated {
                position: self.position,
            });

            if self.position >= self.duration {
                self.playing = false;
                events.push(MediaEvent::Ended);
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Url {
        Url::parse("https://example.com/ep.mp3").unwrap()
    }

    #[test]
    fn load_reports_metadata() {
        let mut media = SimulatedMedia::new(120.0);
        media.set_source(&source());
        media.load();

        assert_eq!(
            media.poll(Duration::ZERO),
            vec![MediaEvent::MetadataLoaded { duration: 120.0 }]
        );
    }

    #[test]
    fn play_without_source_is_rejected() {
        let mut media = SimulatedMedia::new(120.0);
        assert!(matches!(
            media.play(PlayRequestId(1)),
            PlayStart::Rejected(_)
        ));
    }

    #[test]
    fn playback_advances_and_ends() {
        let mut media = SimulatedMedia::new(3.0);
        media.set_source(&source());
        media.load();
        media.poll(Duration::ZERO);

        assert_eq!(media.play(PlayRequestId(1)), PlayStart::Started);
        assert_eq!(
            media.poll(Duration::from_secs(2)),
            vec![MediaEvent::TimeUpdated { position: 2.0 }]
        );
        assert_eq!(
            media.poll(Duration::from_secs(2)),
            vec![MediaEvent::TimeUpdated { position: 3.0 }, MediaEvent::Ended]
        );
        assert!(!media.is_playing());
    }

    #[test]
    fn paused_media_stays_put() {
        let mut media = SimulatedMedia::new(30.0);
        media.set_source(&source());
        media.play(PlayRequestId(1));
        media.pause();

        assert!(media.poll(Duration::from_secs(5)).is_empty());
        assert_eq!(media.position(), 0.0);
    }

    #[test]
    fn position_is_clamped_to_duration() {
        let mut media = SimulatedMedia::new(30.0);
        media.set_position(99.0);
        assert_eq!(media.position(), 30.0);
        media.set_position(-4.0);
        assert_eq!(media.position(), 0.0);
    }
}
