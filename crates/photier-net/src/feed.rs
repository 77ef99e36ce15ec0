//! Candidate URL feed client.
//!
//! The feed lists posts, each carrying a `media` array of images:
//!
//! ```json
//! {"result": [{"media": [{"url": "https://.../1.jpg"}, ...]}, ...], "count": 12}
//! ```

use crate::NetError;
use async_trait::async_trait;
use photier_core::{CandidateFeed, Config, FeedError};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(alias = "data")]
    result: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(default)]
    media: Vec<FeedMedia>,
}

#[derive(Debug, Deserialize)]
struct FeedMedia {
    url: String,
}

pub struct FeedClient {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl FeedClient {
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, NetError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    /// `None` when no feed URL is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, NetError> {
        config
            .feed_url
            .as_ref()
            .map(|url| {
                Self::new(
                    url.clone(),
                    config.feed_token.clone(),
                    config.http_timeout(),
                    &config.user_agent,
                )
            })
            .transpose()
    }
}

#[async_trait]
impl CandidateFeed for FeedClient {
    async fn fetch_candidate_urls(&self) -> Result<HashSet<String>, FeedError> {
        let mut req = self.client.get(&self.url);
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, token);
        }
        let body = req
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FeedError::Request(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?;
        let urls = parse_feed(&body)?;
        tracing::debug!(feed = %self.url, urls = urls.len(), "feed fetched");
        Ok(urls)
    }
}

/// Every media URL in a feed response body.
pub fn parse_feed(body: &[u8]) -> Result<HashSet<String>, FeedError> {
    let resp: FeedResponse =
        serde_json::from_slice(body).map_err(|e| FeedError::Malformed(e.to_string()))?;
    Ok(resp
        .result
        .into_iter()
        .flat_map(|item| item.media)
        .map(|m| m.url)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, Route};

    const BODY: &[u8] = br#"{
        "result": [
            {"id": 1, "media": [{"url": "https://cdn/a.jpg", "type": "image"}, {"url": "https://cdn/b.png"}]},
            {"id": 2, "media": []},
            {"id": 3},
            {"id": 4, "media": [{"url": "https://cdn/a.jpg"}]}
        ],
        "count": 4
    }"#;

    #[test]
    fn test_parse_feed_collects_unique_urls() {
        let urls = parse_feed(BODY).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://cdn/a.jpg"));
        assert!(urls.contains("https://cdn/b.png"));
    }

    #[test]
    fn test_parse_feed_data_alias() {
        let urls = parse_feed(br#"{"data": [{"media": [{"url": "x.jpg"}]}]}"#).unwrap();
        assert!(urls.contains("x.jpg"));
    }

    #[test]
    fn test_parse_feed_malformed() {
        assert!(matches!(
            parse_feed(b"not json"),
            Err(FeedError::Malformed(_))
        ));
        assert!(matches!(
            parse_feed(br#"{"items": []}"#),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_config_without_feed_url() {
        let config = Config::default();
        assert!(FeedClient::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_candidate_urls() {
        let base = serve(vec![Route::new("GET", "/all-images", 200, BODY)]).await;
        let client = FeedClient::new(
            format!("{base}/all-images"),
            Some("secret".into()),
            Duration::from_secs(5),
            "photier-test",
        )
        .unwrap();
        let urls = client.fetch_candidate_urls().await.unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let base = serve(vec![Route::new("GET", "/all-images", 500, b"oops")]).await;
        let client =
            FeedClient::new(format!("{base}/all-images"), None, Duration::from_secs(5), "t").unwrap();
        assert!(matches!(
            client.fetch_candidate_urls().await,
            Err(FeedError::Request(_))
        ));
    }
}
