// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::player::Episode;

/// Summary entry of the show listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShowPreview {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Number of seasons
    #[serde(default)]
    pub seasons: u32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub genres: Vec<u32>,
    #[serde(default)]
    pub updated: String,
}

impl ShowPreview {
    /// Parsed `updated` timestamp, `None` if missing or malformed
    pub fn updated_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.updated).ok()
    }
}

/// A show with its full season and episode listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Show {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Season {
    pub season: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub episodes: Vec<ShowEpisode>,
}

/// Episode entry as listed by the catalog
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShowEpisode {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub episode: u32,
    /// Audio URL
    pub file: String,
}

impl Show {
    /// Flatten all seasons into playable episodes.
    ///
    /// Episode ids follow `{show}-s{season}-e{episode}`. A season without its
    /// own image falls back to the show image.
    pub fn episodes(&self) -> Vec<Episode> {
        self.seasons
            .iter()
            .flat_map(|season| {
                let image = if season.image.is_empty() {
                    &self.image
                } else {
                    &season.image
                };

                season.episodes.iter().map(move |ep| Episode {
                    episode_id: episode_id(&self.id, season.season, ep.episode),
                    audio_url: ep.file.clone(),
                    title: ep.title.clone(),
                    season: season.season,
                    episode: ep.episode,
                    show_title: self.title.clone(),
                    show_image: image.clone(),
                })
            })
            .collect()
    }

    /// Look up one episode by season and episode number
    pub fn find_episode(&self, season: u32, episode: u32) -> Option<Episode> {
        self.episodes()
            .into_iter()
            .find(|e| e.season == season && e.episode == episode)
    }
}

/// Build the id used to key progress records
pub fn episode_id(show_id: &str, season: u32, episode: u32) -> String {
    format!("{show_id}-s{season}-e{episode}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_show() -> Show {
        serde_json::from_str(
            r#"{
                "id": "10716",
                "title": "Something Was Wrong",
                "image": "https://example.com/show.jpg",
                "seasons": [
                    {
                        "season": 1,
                        "title": "Season 1",
                        "image": "https://example.com/s1.jpg",
                        "episodes": [
                            {"title": "One", "description": "", "episode": 1, "file": "https://example.com/1.mp3"},
                            {"title": "Two", "description": "", "episode": 2, "file": "https://example.com/2.mp3"}
                        ]
                    },
                    {
                        "season": 2,
                        "title": "Season 2",
                        "episodes": [
                            {"title": "Three", "episode": 1, "file": "https://example.com/3.mp3"}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn episodes_are_flattened_with_ids() {
        let episodes = make_show().episodes();
        let ids: Vec<_> = episodes.iter().map(|e| e.episode_id.as_str()).collect();

        assert_eq!(ids, vec!["10716-s1-e1", "10716-s1-e2", "10716-s2-e1"]);
        assert_eq!(episodes[0].show_title, "Something Was Wrong");
        assert_eq!(episodes[1].audio_url, "https://example.com/2.mp3");
    }

    #[test]
    fn season_image_falls_back_to_show_image() {
        let episodes = make_show().episodes();
        assert_eq!(episodes[0].show_image, "https://example.com/s1.jpg");
        assert_eq!(episodes[2].show_image, "https://example.com/show.jpg");
    }

    #[test]
    fn find_episode_by_numbers() {
        let show = make_show();
        assert_eq!(
            show.find_episode(2, 1).map(|e| e.title),
            Some("Three".to_string())
        );
        assert!(show.find_episode(3, 1).is_none());
    }

    #[test]
    fn preview_parses_updated_timestamp() {
        let preview: ShowPreview = serde_json::from_str(
            r#"{"id": "1", "title": "T", "seasons": 2, "genres": [1, 3], "updated": "2022-11-03T07:00:00.000Z"}"#,
        )
        .unwrap();

        assert_eq!(preview.seasons, 2);
        assert_eq!(preview.genres, vec![1, 3]);
        assert!(preview.updated_at().is_some());
    }

    #[test]
    fn preview_tolerates_bad_timestamp() {
        let preview: ShowPreview =
            serde_json::from_str(r#"{"id": "1", "title": "T", "updated": "yesterday"}"#).unwrap();
        assert!(preview.updated_at().is_none());
    }
}
