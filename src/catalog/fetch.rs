// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::CatalogError;
use crate::http::HttpClient;

use super::model::{Show, ShowPreview};

/// Default catalog endpoint
pub const DEFAULT_CATALOG_URL: &str = "https://podcast-api.netlify.app";

/// Fetch the raw response body, turning error statuses into `CatalogError`
async fn fetch_body<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, CatalogError> {
    debug!(url, "Fetching catalog resource");

    let response = client
        .get(url)
        .await
        .map_err(|e| CatalogError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.is_error() {
        return Err(CatalogError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    Ok(response.body.to_vec())
}

/// Parse a show listing, which must be a JSON array
pub fn parse_catalog(bytes: &[u8], url: &str) -> Result<Vec<ShowPreview>, CatalogError> {
    let parse_error = |e: serde_json::Error| CatalogError::Parse {
        url: url.to_string(),
        source: e,
    };

    let value: Value = serde_json::from_slice(bytes).map_err(parse_error)?;
    if !value.is_array() {
        return Err(CatalogError::NotAnArray {
            url: url.to_string(),
        });
    }

    serde_json::from_value(value).map_err(parse_error)
}

/// Fetch and parse the show listing at `url`
pub async fn fetch_catalog<C: HttpClient>(
    client: &C,
    url: &str,
) -> Result<Vec<ShowPreview>, CatalogError> {
    Url::parse(url)?;

    let result = fetch_body(client, url)
        .await
        .and_then(|bytes| parse_catalog(&bytes, url));

    if let Err(e) = &result {
        warn!(url, error = %e, operation = "fetch_catalog", "Catalog fetch failed");
    }
    result
}

/// Fetch a single show with its seasons from `{base_url}/id/{show_id}`
pub async fn fetch_show<C: HttpClient>(
    client: &C,
    base_url: &str,
    show_id: &str,
) -> Result<Show, CatalogError> {
    let url = show_url(base_url, show_id)?;
    let bytes = fetch_body(client, url.as_str()).await?;

    serde_json::from_slice(&bytes).map_err(|e| CatalogError::Parse {
        url: url.to_string(),
        source: e,
    })
}

/// Build the show detail URL, treating `base_url` as a directory
pub fn show_url(base_url: &str, show_id: &str) -> Result<Url, CatalogError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("id/{show_id}"))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::http::HttpResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct MockHttpClient {
        status: u16,
        body: String,
        requested: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: self.status,
                body: Bytes::from(self.body.clone()),
            })
        }
    }

    const SAMPLE_CATALOG: &str = r#"[
        {"id": "10716", "title": "Something Was Wrong", "description": "", "seasons": 14,
         "image": "https://example.com/a.jpg", "genres": [1, 2], "updated": "2022-11-03T07:00:00.000Z"},
        {"id": "5675", "title": "This Is Actually Happening", "seasons": 12, "genres": [3]}
    ]"#;

    #[tokio::test]
    async fn fetch_catalog_parses_array() {
        let client = MockHttpClient::new(200, SAMPLE_CATALOG);
        let shows = fetch_catalog(&client, DEFAULT_CATALOG_URL).await.unwrap();

        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].id, "10716");
        assert_eq!(shows[1].seasons, 12);
    }

    #[tokio::test]
    async fn non_array_payload_is_rejected() {
        let client = MockHttpClient::new(200, r#"{"error": "nope"}"#);
        let result = fetch_catalog(&client, DEFAULT_CATALOG_URL).await;

        assert!(matches!(result, Err(CatalogError::NotAnArray { .. })));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let client = MockHttpClient::new(503, "");
        let result = fetch_catalog(&client, DEFAULT_CATALOG_URL).await;

        match result {
            Err(CatalogError::HttpStatus { status, .. }) => assert_eq!(status, 503),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let client = MockHttpClient::new(200, "[{");
        let result = fetch_catalog(&client, DEFAULT_CATALOG_URL).await;

        assert!(matches!(result, Err(CatalogError::Parse { .. })));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_fetching() {
        let client = MockHttpClient::new(200, SAMPLE_CATALOG);
        let result = fetch_catalog(&client, "not a url").await;

        assert!(matches!(result, Err(CatalogError::InvalidUrl(_))));
        assert!(client.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_show_requests_detail_endpoint() {
        let client = MockHttpClient::new(
            200,
            r#"{"id": "10716", "title": "Show", "seasons": [
                {"season": 1, "episodes": [{"title": "One", "episode": 1, "file": "https://example.com/1.mp3"}]}
            ]}"#,
        );

        let show = fetch_show(&client, DEFAULT_CATALOG_URL, "10716").await.unwrap();

        assert_eq!(show.episodes()[0].episode_id, "10716-s1-e1");
        assert_eq!(
            client.requested.lock().unwrap().as_slice(),
            ["https://podcast-api.netlify.app/id/10716"]
        );
    }

    #[test]
    fn show_url_keeps_base_path() {
        let url = show_url("https://example.com/api", "42").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/id/42");
    }
}
