// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

/// Tunables for the playback engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fraction of the duration after which an episode counts as completed
    pub completion_threshold: f64,
    /// Write a progress checkpoint each time playback crosses a multiple of this many seconds
    pub checkpoint_interval_secs: u32,
    /// Default distance for skip forward/backward, in seconds
    pub skip_seconds: f64,
    /// Delay before a repeating episode is restarted
    pub repeat_delay: Duration,
    /// Maximum number of recently played entries
    pub recently_played_limit: usize,
    /// Volume used when nothing has been persisted yet
    pub default_volume: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            completion_threshold: 0.95,
            checkpoint_interval_secs: 5,
            skip_seconds: 15.0,
            repeat_delay: Duration::from_millis(500),
            recently_played_limit: 10,
            default_volume: 70,
        }
    }
}
