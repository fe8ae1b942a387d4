//! Upstream provider clients.
//!
//! Each provider sits behind a small trait so handlers receive an injected
//! client (and tests a double) instead of reaching for process-wide state.
//! Clients only exist when their key resolved, which is how a missing key
//! disables exactly the routes that need it.

mod gemini;
mod remove_bg;
mod youtube;

pub use gemini::GeminiClient;
pub use remove_bg::RemoveBgClient;
pub use youtube::YoutubeClient;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

use crate::proxy::types::{ChatRequest, ImageSource};

/// Failure talking to an upstream provider.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The provider answered with a non-2xx status. `body` is kept verbatim.
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never produced a usable response (connect, timeout, decode).
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by a non-HTTP backend.
    #[error("{0}")]
    Other(String),
}

impl UpstreamError {
    /// Status reported by the provider, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Http(e) => e.status(),
            UpstreamError::Other(_) => None,
        }
    }

    /// Whether this failure is a quota/rate-limit rejection.
    ///
    /// Gemini signals this with HTTP 429 and `RESOURCE_EXHAUSTED`. When the
    /// provider answered, its status decides; only status-less failures fall
    /// back to scanning the message text.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            UpstreamError::Status { status, body } => {
                *status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED")
            }
            _ => match self.status() {
                Some(status) => status == StatusCode::TOO_MANY_REQUESTS,
                None => {
                    let message = self.to_string();
                    message.contains("429") || message.contains("RESOURCE_EXHAUSTED")
                }
            },
        }
    }
}

/// Chat completion provider (Gemini `generateContent`).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run one completion. `Ok(None)` means the provider answered without
    /// usable text (no candidates, blank parts, or a safety block).
    async fn generate(&self, request: &ChatRequest) -> Result<Option<String>, UpstreamError>;
}

/// Video search provider (YouTube Data API).
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Search videos; returns the provider's `items` array.
    async fn search(&self, query: &str) -> Result<Vec<serde_json::Value>, UpstreamError>;

    /// Look up a channel; returns the provider's JSON document unchanged.
    async fn channel(&self, channel_id: &str) -> Result<serde_json::Value, UpstreamError>;
}

/// Background removal provider (remove.bg).
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Returns the PNG bytes of the cut-out image.
    async fn remove_background(&self, image: &ImageSource) -> Result<Bytes, UpstreamError>;
}

/// Stands in for an error body that could not be read.
const UNREADABLE_BODY: &str = "<unreadable body>";

/// Read the body of a failed upstream response into an `UpstreamError`.
async fn status_error(response: reqwest::Response) -> UpstreamError {
    let status = response.status();
    let body = body_or_marker(status, response.text().await);
    UpstreamError::Status { status, body }
}

fn body_or_marker<E: std::fmt::Display>(status: StatusCode, body: Result<String, E>) -> String {
    match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(%status, error = %e, "failed to read upstream error body");
            UNREADABLE_BODY.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_by_status() {
        let error = UpstreamError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "slow down".to_string(),
        };
        assert!(error.is_rate_limit());
        assert_eq!(error.status(), Some(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn test_rate_limit_by_message() {
        assert!(UpstreamError::Other("got 429 Too Many Requests".into()).is_rate_limit());
        assert!(UpstreamError::Other("RESOURCE_EXHAUSTED: quota".into()).is_rate_limit());
    }

    #[test]
    fn test_429_inside_non_429_body_is_not_a_rate_limit() {
        let error = UpstreamError::Status {
            status: StatusCode::BAD_REQUEST,
            body: "INVALID_ARGUMENT: input token count (1429001) exceeds the maximum".to_string(),
        };
        assert!(!error.is_rate_limit());
    }

    #[test]
    fn test_resource_exhausted_body_is_a_rate_limit() {
        let error = UpstreamError::Status {
            status: StatusCode::FORBIDDEN,
            body: r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
        };
        assert!(error.is_rate_limit());
    }

    #[test]
    fn test_unreadable_body_is_marked() {
        let body = body_or_marker(StatusCode::FORBIDDEN, Err::<String, _>("connection reset"));
        assert_eq!(body, UNREADABLE_BODY);

        let error = UpstreamError::Status {
            status: StatusCode::FORBIDDEN,
            body,
        };
        assert_eq!(
            error.to_string(),
            "upstream returned 403 Forbidden: <unreadable body>"
        );
    }

    #[test]
    fn test_readable_body_is_kept() {
        let body = body_or_marker::<&str>(StatusCode::FORBIDDEN, Ok("API key not valid".to_string()));
        assert_eq!(body, "API key not valid");
    }

    #[test]
    fn test_other_failures_are_not_rate_limits() {
        let error = UpstreamError::Status {
            status: StatusCode::FORBIDDEN,
            body: "API key not valid".to_string(),
        };
        assert!(!error.is_rate_limit());
        assert!(error.to_string().contains("API key not valid"));
    }
}
