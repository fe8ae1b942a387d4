//! HTTP request handlers.
//!
//! Every handler checks its provider's key first, then its validated input,
//! then makes exactly one upstream call. Nothing is retried.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use super::extract::{Valid, ValidQuery};
use super::server::AppState;
use super::types::{
    ChannelQuery, ChatReply, ChatRequest, RemoveBackgroundRequest, SearchReply, StubAck,
    YoutubeSearchRequest,
};
use crate::config::Provider;
use crate::error::{Error, Result};
use crate::upstream::UpstreamError;

/// Turn a chat upstream failure into the client-facing error.
///
/// Quota rejections get their own status and a retry hint; everything else
/// carries the raw upstream message for diagnosis.
fn classify_chat_failure(error: UpstreamError) -> Error {
    if error.is_rate_limit() {
        tracing::warn!(error = %error, "Gemini rate limit hit");
        Error::RateLimited
    } else {
        tracing::error!(error = %error, status = ?error.status(), "Gemini call failed");
        Error::ChatUpstream(error.to_string())
    }
}

/// Map a non-chat upstream failure, keeping the provider's status when it sent one.
fn upstream_failure(provider: Provider, error: UpstreamError) -> Error {
    tracing::error!(provider = %provider, error = %error, "Upstream call failed");
    Error::Upstream {
        provider,
        status: error.status(),
        message: error.to_string(),
    }
}

fn require(state: &AppState, provider: Provider) -> Result<()> {
    if state.is_ready(provider) {
        Ok(())
    } else {
        Err(Error::KeyMissing { provider })
    }
}

/// Handle GET /, GET /health and GET /chat
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let service_status = if state.is_ready(Provider::Gemini) {
        "Gemini AI client ready".to_string()
    } else {
        format!(
            "Gemini AI key missing (set {})",
            Provider::Gemini.env_var()
        )
    };

    let providers: serde_json::Map<String, serde_json::Value> = Provider::ALL
        .iter()
        .map(|p| {
            let status = if state.is_ready(*p) { "ready" } else { "missing_key" };
            (p.name().to_string(), serde_json::Value::from(status))
        })
        .collect();

    Json(serde_json::json!({
        "status": "ok",
        "service_status": service_status,
        "test_message": "Use POST /chat to send messages",
        "providers": providers,
    }))
}

/// Handle POST /chat (and POST /)
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Valid<ChatRequest>, Error>,
) -> Result<Json<ChatReply>> {
    let backend = state.chat.clone().ok_or(Error::KeyMissing {
        provider: Provider::Gemini,
    })?;
    let Valid(request) = payload?;

    tracing::info!(
        turns = request.contents.len(),
        system_instruction = request.system_instruction.is_some(),
        "Received chat request"
    );

    match backend.generate(&request).await {
        Ok(Some(text)) => Ok(Json(ChatReply::new(text))),
        Ok(None) => {
            tracing::warn!("Gemini returned no usable text");
            Err(Error::EmptyResponse)
        }
        Err(e) => Err(classify_chat_failure(e)),
    }
}

/// Handle POST /youtube
pub async fn youtube_search(
    State(state): State<AppState>,
    payload: std::result::Result<Valid<YoutubeSearchRequest>, Error>,
) -> Result<Json<SearchReply>> {
    let video = state.video.clone().ok_or(Error::KeyMissing {
        provider: Provider::Youtube,
    })?;
    let Valid(query) = payload?;

    tracing::info!(query = %query, "Received YouTube search");

    let items = video
        .search(&query)
        .await
        .map_err(|e| upstream_failure(Provider::Youtube, e))?;

    Ok(Json(SearchReply {
        success: true,
        items,
    }))
}

/// Handle GET /youtube-channel?channelId=
///
/// The upstream document is passed through unchanged.
pub async fn youtube_channel(
    State(state): State<AppState>,
    query: std::result::Result<ValidQuery<ChannelQuery>, Error>,
) -> Result<Json<serde_json::Value>> {
    let video = state.video.clone().ok_or(Error::KeyMissing {
        provider: Provider::Youtube,
    })?;
    let ValidQuery(channel_id) = query?;

    tracing::info!(channel_id = %channel_id, "Received YouTube channel lookup");

    let body = video
        .channel(&channel_id)
        .await
        .map_err(|e| upstream_failure(Provider::Youtube, e))?;

    Ok(Json(body))
}

/// Handle POST /remove-background
///
/// Unlike every other route, success is the raw PNG, not a JSON envelope.
pub async fn remove_background(
    State(state): State<AppState>,
    payload: std::result::Result<Valid<RemoveBackgroundRequest>, Error>,
) -> Result<Response> {
    let remover = state.background.clone().ok_or(Error::KeyMissing {
        provider: Provider::RemoveBg,
    })?;
    let Valid(image) = payload?;

    let image_bytes = remover
        .remove_background(&image)
        .await
        .map_err(|e| upstream_failure(Provider::RemoveBg, e))?;

    tracing::info!(bytes = image_bytes.len(), "Background removed");

    Ok(([(header::CONTENT_TYPE, "image/png")], image_bytes).into_response())
}

/// Handle POST /tts
pub async fn tts(State(state): State<AppState>) -> Result<Json<StubAck>> {
    require(&state, Provider::ElevenLabs)?;
    Ok(Json(StubAck {
        success: true,
        message: "Eleven Labs route is ready; the upstream call is not wired up yet.".to_string(),
    }))
}

/// Handle POST /send-email
pub async fn send_email(State(state): State<AppState>) -> Result<Json<StubAck>> {
    require(&state, Provider::EmailJs)?;
    Ok(Json(StubAck {
        success: true,
        message: "Email route is ready; the backend keeps the EmailJS key private.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_classify_429_status_as_rate_limit() {
        let error = classify_chat_failure(UpstreamError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "{}".to_string(),
        });
        assert!(matches!(error, Error::RateLimited));
    }

    #[test]
    fn test_classify_other_status_keeps_raw_message() {
        let error = classify_chat_failure(UpstreamError::Status {
            status: StatusCode::FORBIDDEN,
            body: "API_KEY_INVALID".to_string(),
        });
        match error {
            Error::ChatUpstream(message) => assert!(message.contains("API_KEY_INVALID")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_upstream_failure_keeps_status() {
        let error = upstream_failure(
            Provider::Youtube,
            UpstreamError::Status {
                status: StatusCode::NOT_FOUND,
                body: "no such channel".to_string(),
            },
        );
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.code(), "UPSTREAM_FAILURE");
    }
}
