// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod config;
mod engine;
mod media;
mod observer;
mod state;
pub mod transition;

pub use config::EngineConfig;
pub use engine::PlaybackEngine;
pub use media::{MediaElement, MediaEvent, PlayRequestId, PlayStart, SimulatedMedia};
pub use observer::{NoopObserver, PlaybackObserver, PlayerEvent, SharedObserver, SubscriptionId};
pub use state::{Episode, PlaybackHistory, PlaybackState, Phase, ProgressRecord, RecentlyPlayed};
