//! HTTP server setup and configuration.

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;

use super::handlers;
use crate::config::{Config, Provider};
use crate::error::{Error, Result};
use crate::upstream::{
    BackgroundRemover, ChatBackend, GeminiClient, RemoveBgClient, VideoSearch, YoutubeClient,
};

/// Response header: correlation ID (UUID v4), also recorded on the request span.
pub const REQUEST_ID_HEADER: &str = "x-keyward-request-id";

/// Shared application state.
///
/// Built once at startup and read-only afterwards. An upstream client is
/// `None` when its key did not resolve; only that provider's routes fail.
#[derive(Clone)]
pub struct AppState {
    pub chat: Option<Arc<dyn ChatBackend>>,
    pub video: Option<Arc<dyn VideoSearch>>,
    pub background: Option<Arc<dyn BackgroundRemover>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// State with no upstream clients; used as a base for injecting doubles.
    pub fn new(config: Config) -> Self {
        Self {
            chat: None,
            video: None,
            background: None,
            config: Arc::new(config),
        }
    }

    /// Build real upstream clients for every provider whose key resolved.
    pub fn from_config(config: Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.server.timeout_secs))
            .connect_timeout(Duration::from_secs(config.server.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let chat = config.gemini.api_key.clone().map(|key| {
            Arc::new(GeminiClient::new(
                http_client.clone(),
                config.gemini.base_url.clone(),
                config.gemini.model.clone(),
                key,
            )) as Arc<dyn ChatBackend>
        });

        let video = config.youtube.api_key.clone().map(|key| {
            Arc::new(YoutubeClient::new(
                http_client.clone(),
                config.youtube.base_url.clone(),
                config.youtube.max_results,
                key,
            )) as Arc<dyn VideoSearch>
        });

        let background = config.remove_bg.api_key.clone().map(|key| {
            Arc::new(RemoveBgClient::new(
                http_client.clone(),
                config.remove_bg.base_url.clone(),
                key,
            )) as Arc<dyn BackgroundRemover>
        });

        Ok(Self {
            chat,
            video,
            background,
            config: Arc::new(config),
        })
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatBackend>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_video(mut self, video: Arc<dyn VideoSearch>) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_background(mut self, background: Arc<dyn BackgroundRemover>) -> Self {
        self.background = Some(background);
        self
    }

    /// Whether routes for `provider` can serve requests.
    pub fn is_ready(&self, provider: Provider) -> bool {
        match provider {
            Provider::Gemini => self.chat.is_some(),
            Provider::Youtube => self.video.is_some(),
            Provider::RemoveBg => self.background.is_some(),
            Provider::ElevenLabs | Provider::EmailJs => self.config.api_key(provider).is_some(),
        }
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let cors = state.config.server.cors;

    let router = Router::new()
        // Health
        .route("/", get(handlers::health).post(handlers::chat))
        .route("/health", get(handlers::health))
        // Gemini
        .route("/chat", get(handlers::health).post(handlers::chat))
        // YouTube
        .route("/youtube", post(handlers::youtube_search))
        .route("/youtube-channel", get(handlers::youtube_channel))
        // remove.bg
        .route("/remove-background", post(handlers::remove_background))
        // Placeholders
        .route("/tts", post(handlers::tts))
        .route("/send-email", post(handlers::send_email))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(assign_request_id))
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Tag each request with a UUID, run it inside a span carrying that id,
/// and echo the id back in [`REQUEST_ID_HEADER`].
async fn assign_request_id(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    let state = AppState::from_config(config)?;
    for provider in Provider::ALL {
        if state.is_ready(provider) {
            tracing::info!(provider = %provider, "Upstream ready");
        } else {
            tracing::warn!(
                provider = %provider,
                env_var = provider.env_var(),
                "No API key; routes for this provider will answer KEY_MISSING_OR_INVALID"
            );
        }
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting keyward proxy server");

    axum::serve(listener, app).await?;

    Ok(())
}
