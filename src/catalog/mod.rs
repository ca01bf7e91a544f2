// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod fetch;
mod model;

pub use fetch::{DEFAULT_CATALOG_URL, fetch_catalog, fetch_show, parse_catalog, show_url};
pub use model::{Season, Show, ShowEpisode, ShowPreview, episode_id};
