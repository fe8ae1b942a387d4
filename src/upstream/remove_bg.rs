//! remove.bg client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;

use super::{status_error, BackgroundRemover, UpstreamError};
use crate::config::ApiKey;
use crate::proxy::types::ImageSource;

const API_KEY_HEADER: &str = "X-Api-Key";

pub struct RemoveBgClient {
    http: Client,
    base_url: String,
    api_key: ApiKey,
}

impl RemoveBgClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct RemoveBgRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_file_b64: Option<&'a str>,
    size: &'static str,
    format: &'static str,
}

impl<'a> RemoveBgRequest<'a> {
    fn new(image: &'a ImageSource) -> Self {
        let (image_url, image_file_b64) = match image {
            ImageSource::Url(url) => (Some(url.as_str()), None),
            ImageSource::Base64(data) => (None, Some(data.as_str())),
        };
        Self {
            image_url,
            image_file_b64,
            size: "auto",
            // Routes answer with image/png, so ask for exactly that.
            format: "png",
        }
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, image: &ImageSource) -> Result<Bytes, UpstreamError> {
        let url = format!("{}/v1.0/removebg", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&RemoveBgRequest::new(image))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(response.bytes().await?)
    }
}
