//! Error types for keyward.
//!
//! Every failure a route can hit ends up here and is rendered as the JSON
//! error envelope `{success: false, error, code}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::Provider;

/// Result type alias for keyward operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for keyward.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("The {provider} API key is missing or invalid on the server")]
    KeyMissing { provider: Provider },

    #[error("Gemini returned an empty or unusable response, possibly filtered")]
    EmptyResponse,

    #[error("Gemini quota exceeded (HTTP 429). Wait a moment and try again.")]
    RateLimited,

    #[error("Gemini request failed: {0}")]
    ChatUpstream(String),

    #[error("{provider} request failed: {message}")]
    Upstream {
        provider: Provider,
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::KeyMissing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::EmptyResponse => StatusCode::INTERNAL_SERVER_ERROR,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::ChatUpstream(_) => StatusCode::BAD_GATEWAY,
            Error::Upstream { status, .. } => status.unwrap_or(StatusCode::BAD_GATEWAY),
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code carried in the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "BAD_REQUEST",
            Error::KeyMissing { .. } => "KEY_MISSING_OR_INVALID",
            Error::EmptyResponse => "EMPTY_GEMINI_RESPONSE",
            Error::RateLimited => "RATE_LIMITED",
            Error::ChatUpstream(_) => "GEMINI_API_FAILURE",
            Error::Upstream { .. } => "UPSTREAM_FAILURE",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        // Upstream statuses outside 4xx/5xx would read as success to clients.
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::BAD_GATEWAY
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_envelope() {
        let (status, json) = render(Error::BadRequest("contents is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json["error"].as_str().unwrap().contains("contents"));
    }

    #[tokio::test]
    async fn test_key_missing_names_provider() {
        let (status, json) = render(Error::KeyMissing {
            provider: Provider::Youtube,
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "KEY_MISSING_OR_INVALID");
        assert!(json["error"].as_str().unwrap().contains("youtube"));
    }

    #[tokio::test]
    async fn test_upstream_status_is_propagated() {
        let (status, json) = render(Error::Upstream {
            provider: Provider::Youtube,
            status: Some(StatusCode::FORBIDDEN),
            message: "quotaExceeded".into(),
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "UPSTREAM_FAILURE");
    }

    #[tokio::test]
    async fn test_upstream_without_status_is_bad_gateway() {
        let (status, _) = render(Error::Upstream {
            provider: Provider::RemoveBg,
            status: None,
            message: "connection refused".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_non_error_upstream_status_is_coerced() {
        let (status, _) = render(Error::Upstream {
            provider: Provider::RemoveBg,
            status: Some(StatusCode::MOVED_PERMANENTLY),
            message: "redirect".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_codes() {
        assert_eq!(Error::EmptyResponse.code(), "EMPTY_GEMINI_RESPONSE");
        assert_eq!(Error::RateLimited.code(), "RATE_LIMITED");
        assert_eq!(Error::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(Error::ChatUpstream("x".into()).code(), "GEMINI_API_FAILURE");
    }
}
