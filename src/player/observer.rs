// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::error::PlaybackError;

use super::state::{PlaybackState, ProgressRecord};

/// Notifications published by the playback engine
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The observable state changed
    StateChanged(PlaybackState),

    /// A start request resolved and audio is running
    PlaybackStarted { episode_id: String },

    /// Starting or continuing playback failed
    PlaybackFailed { error: PlaybackError },

    /// A progress checkpoint was written
    ProgressSaved {
        episode_id: String,
        record: ProgressRecord,
    },

    /// The recently played list changed; ids are most-recent-first
    RecentlyPlayedChanged { episode_ids: Vec<String> },

    /// Progress and recently played history were wiped
    HistoryCleared,

    /// Writing the persisted snapshot failed; state is kept in memory only
    PersistenceDegraded { error: String },
}

/// Trait for consumers interested in engine notifications.
///
/// Implementations can use this to refresh a UI, log activity,
/// or collect statistics.
pub trait PlaybackObserver: Send + Sync {
    fn notify(&self, event: &PlayerEvent);
}

/// A shared reference to an observer
pub type SharedObserver = Arc<dyn PlaybackObserver>;

/// Handle returned by `subscribe`, used to unsubscribe again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An observer that silently ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PlaybackObserver for NoopObserver {
    fn notify(&self, _event: &PlayerEvent) {}
}

impl NoopObserver {
    /// Create a new NoopObserver wrapped in an Arc
    pub fn shared() -> SharedObserver {
        Arc::new(Self)
    }
}

/// Registered observers in subscription order
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, SharedObserver)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: SharedObserver) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&self, event: &PlayerEvent) {
        for (_, observer) in &self.entries {
            observer.notify(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Observer that keeps every event it receives
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        events: Mutex<Vec<PlayerEvent>>,
    }

    impl RecordingObserver {
        pub(crate) fn events(&self) -> Vec<PlayerEvent> {
            self.events.lock().unwrap().clone()
        }

        pub(crate) fn started_ids(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    PlayerEvent::PlaybackStarted { episode_id } => Some(episode_id),
                    _ => None,
                })
                .collect()
        }
    }

    impl PlaybackObserver for RecordingObserver {
        fn notify(&self, event: &PlayerEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingObserver;
    use super::*;

    #[test]
    fn noop_observer_handles_all_events() {
        let observer = NoopObserver;

        observer.notify(&PlayerEvent::StateChanged(PlaybackState::new(70)));
        observer.notify(&PlayerEvent::PlaybackStarted {
            episode_id: "ep-1".to_string(),
        });
        observer.notify(&PlayerEvent::HistoryCleared);
        observer.notify(&PlayerEvent::PersistenceDegraded {
            error: "disk full".to_string(),
        });
    }

    #[test]
    fn unsubscribed_observers_stop_receiving() {
        let mut observers = Observers::default();
        let first = Arc::new(RecordingObserver::default());
        let second = Arc::new(RecordingObserver::default());

        let first_id = observers.subscribe(first.clone());
        observers.subscribe(second.clone());
        observers.notify(&PlayerEvent::HistoryCleared);

        assert!(observers.unsubscribe(first_id));
        assert!(!observers.unsubscribe(first_id));
        observers.notify(&PlayerEvent::HistoryCleared);

        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events().len(), 2);
        assert_eq!(observers.len(), 1);
    }
}
