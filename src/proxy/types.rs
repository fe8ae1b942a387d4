//! Request and response types for each route.
//!
//! Request bodies are deserialized into these types and then checked with
//! [`Validate`] before a handler runs, so handlers only ever see input that
//! is safe to forward upstream.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Boundary check for a deserialized request.
///
/// `validate` consumes the raw request and yields the value the handler
/// works with, so an unchecked request cannot reach upstream code.
pub trait Validate: Sized {
    type Output;

    fn validate(self) -> Result<Self::Output>;
}

/// Chat request: the full conversation plus an optional system instruction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

/// One conversation turn, in Gemini's wire shape.
///
/// `role` may be omitted for single-turn requests; Gemini treats it as `user`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    pub parts: Vec<Part>,
}

/// A piece of a turn: text or inline media.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

/// Inline media (base64 data with its MIME type).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Validate for ChatRequest {
    type Output = ChatRequest;

    fn validate(self) -> Result<ChatRequest> {
        if self.contents.is_empty() {
            return Err(Error::BadRequest(
                "contents (the conversation history) is required".to_string(),
            ));
        }

        if let Some(index) = self.contents.iter().position(|c| c.parts.is_empty()) {
            return Err(Error::BadRequest(format!(
                "contents[{}] has no parts",
                index
            )));
        }

        Ok(self)
    }
}

/// Successful chat envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub success: bool,
    pub gemini_response: String,
}

impl ChatReply {
    pub fn new(text: String) -> Self {
        Self {
            success: true,
            gemini_response: text,
        }
    }
}

/// YouTube search request.
#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeSearchRequest {
    #[serde(default)]
    pub query: String,
}

impl Validate for YoutubeSearchRequest {
    /// The trimmed query.
    type Output = String;

    fn validate(self) -> Result<String> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(Error::BadRequest("query is required".to_string()));
        }
        Ok(query.to_string())
    }
}

/// Query string of `GET /youtube-channel`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelQuery {
    #[serde(rename = "channelId", default)]
    pub channel_id: String,
}

impl Validate for ChannelQuery {
    type Output = String;

    fn validate(self) -> Result<String> {
        let channel_id = self.channel_id.trim();
        if channel_id.is_empty() {
            return Err(Error::BadRequest("channelId is required".to_string()));
        }
        Ok(channel_id.to_string())
    }
}

/// Successful search envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchReply {
    pub success: bool,
    pub items: Vec<serde_json::Value>,
}

/// Background removal request. `base64_image` is accepted for older clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBackgroundRequest {
    pub image_url: Option<String>,
    #[serde(alias = "base64_image")]
    pub base64_image: Option<String>,
}

/// Where the image to process comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    Base64(String),
}

impl Validate for RemoveBackgroundRequest {
    type Output = ImageSource;

    fn validate(self) -> Result<ImageSource> {
        let url = self.image_url.filter(|s| !s.trim().is_empty());
        let data = self.base64_image.filter(|s| !s.trim().is_empty());

        match (url, data) {
            (Some(url), None) => Ok(ImageSource::Url(url)),
            (None, Some(data)) => Ok(ImageSource::Base64(data)),
            (Some(_), Some(_)) => Err(Error::BadRequest(
                "send either imageUrl or base64Image, not both".to_string(),
            )),
            (None, None) => Err(Error::BadRequest(
                "an image is required: send imageUrl or base64Image".to_string(),
            )),
        }
    }
}

/// Acknowledgment returned by placeholder routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StubAck {
    pub success: bool,
    pub message: String,
}
