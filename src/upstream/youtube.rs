//! YouTube Data API v3 client.

use async_trait::async_trait;
use reqwest::Client;

use super::{status_error, UpstreamError, VideoSearch};
use crate::config::ApiKey;

pub struct YoutubeClient {
    http: Client,
    base_url: String,
    max_results: u32,
    api_key: ApiKey,
}

impl YoutubeClient {
    pub fn new(http: Client, base_url: impl Into<String>, max_results: u32, api_key: ApiKey) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            max_results,
            api_key,
        }
    }

    fn url(&self, resource: &str) -> String {
        format!(
            "{}/youtube/v3/{}",
            self.base_url.trim_end_matches('/'),
            resource
        )
    }

    async fn get_json(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, UpstreamError> {
        let response = self
            .http
            .get(self.url(resource))
            .query(params)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await
            // reqwest includes the URL, and with it the key, in its errors.
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(response.json().await.map_err(reqwest::Error::without_url)?)
    }
}

#[async_trait]
impl VideoSearch for YoutubeClient {
    async fn search(&self, query: &str) -> Result<Vec<serde_json::Value>, UpstreamError> {
        let max_results = self.max_results.to_string();
        let body = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("q", query),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        let items = match body.get("items") {
            Some(serde_json::Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(items)
    }

    async fn channel(&self, channel_id: &str) -> Result<serde_json::Value, UpstreamError> {
        self.get_json(
            "channels",
            &[("part", "snippet,statistics"), ("id", channel_id)],
        )
        .await
    }
}
