// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or parsing the podcast catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to fetch catalog from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse catalog JSON from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid data format received from {url}: expected a JSON array")]
    NotAnArray { url: String },

    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors that can occur when reading or writing the persisted snapshot
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read state file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize state: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),

    #[error("Unsupported state version {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Legacy entry '{key}' is malformed: {reason}")]
    MalformedLegacyEntry { key: String, reason: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by the media backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("Playback of '{episode_id}' was rejected: {reason}")]
    StartRejected { episode_id: String, reason: String },

    #[error("Media error while playing '{episode_id}': {message}")]
    Media { episode_id: String, message: String },

    #[error("Invalid audio URL '{url}' for episode '{episode_id}'")]
    InvalidSource { episode_id: String, url: String },
}

impl PlaybackError {
    /// Episode the failure belongs to
    pub fn episode_id(&self) -> &str {
        match self {
            Self::StartRejected { episode_id, .. }
            | Self::Media { episode_id, .. }
            | Self::InvalidSource { episode_id, .. } => episode_id,
        }
    }

    /// Name of the operation that failed, used as a log field
    pub fn operation(&self) -> &'static str {
        match self {
            Self::StartRejected { .. } => "play",
            Self::Media { .. } => "media",
            Self::InvalidSource { .. } => "load",
        }
    }
}
