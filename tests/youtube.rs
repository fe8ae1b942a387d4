//! Integration tests for the YouTube search and channel routes.

use axum::body::Body;
use http::Request;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keyward::config::{ApiKey, Config};
use keyward::proxy::{create_router, AppState};

const YOUTUBE_KEY: &str = "test-youtube-key";

fn app_with_youtube(base_url: &str) -> axum::Router {
    let mut config = Config::default();
    config.youtube.base_url = base_url.to_string();
    config.youtube.api_key = Some(ApiKey::from(YOUTUBE_KEY));
    create_router(AppState::from_config(config).expect("build state"))
}

fn search_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/youtube")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn parse_body(response: axum::response::Response) -> (http::StatusCode, serde_json::Value) {
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or_default();
    (status, json)
}

// ============================================================================
// POST /youtube
// ============================================================================

#[tokio::test]
async fn test_search_returns_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .and(query_param("part", "snippet"))
        .and(query_param("q", "rust async"))
        .and(query_param("maxResults", "10"))
        .and(query_param("key", YOUTUBE_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "youtube#searchListResponse",
            "items": [
                {"id": {"videoId": "abc"}, "snippet": {"title": "Async Rust"}},
                {"id": {"videoId": "def"}, "snippet": {"title": "Tokio"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with_youtube(&server.uri());
    let response = app
        .oneshot(search_request(serde_json::json!({"query": "  rust async "})))
        .await
        .unwrap();
    let (status, json) = parse_body(response).await;

    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["items"][0]["id"]["videoId"], "abc");
}

#[tokio::test]
async fn test_search_without_items_returns_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let app = app_with_youtube(&server.uri());
    let (status, json) =
        parse_body(app.oneshot(search_request(serde_json::json!({"query": "nothing"}))).await.unwrap())
            .await;

    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(json["items"], serde_json::json!([]));
}

#[tokio::test]
async fn test_blank_query_is_bad_request_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_with_youtube(&server.uri());
    for body in [serde_json::json!({}), serde_json::json!({"query": "   "})] {
        let (status, json) = parse_body(app.clone().oneshot(search_request(body)).await.unwrap()).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_search_without_key_is_server_error() {
    let app = create_router(AppState::from_config(Config::default()).unwrap());
    let (status, json) =
        parse_body(app.oneshot(search_request(serde_json::json!({"query": "rust"}))).await.unwrap())
            .await;

    assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "KEY_MISSING_OR_INVALID");
}

#[tokio::test]
async fn test_search_propagates_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {"code": 403, "message": "quotaExceeded"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with_youtube(&server.uri());
    let (status, json) =
        parse_body(app.oneshot(search_request(serde_json::json!({"query": "rust"}))).await.unwrap())
            .await;

    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "UPSTREAM_FAILURE");
    assert!(json["error"].as_str().unwrap().contains("quotaExceeded"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway_and_hides_key() {
    let app = app_with_youtube("http://127.0.0.1:1");
    let (status, json) =
        parse_body(app.oneshot(search_request(serde_json::json!({"query": "rust"}))).await.unwrap())
            .await;

    assert_eq!(status, http::StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "UPSTREAM_FAILURE");
    assert!(!json.to_string().contains(YOUTUBE_KEY));
}

// ============================================================================
// GET /youtube-channel
// ============================================================================

#[tokio::test]
async fn test_channel_passes_upstream_json_through() {
    let upstream = serde_json::json!({
        "kind": "youtube#channelListResponse",
        "items": [{"id": "UC123", "statistics": {"subscriberCount": "42"}}]
    });

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/channels"))
        .and(query_param("id", "UC123"))
        .and(query_param("part", "snippet,statistics"))
        .and(query_param("key", YOUTUBE_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with_youtube(&server.uri());
    let request = Request::get("/youtube-channel?channelId=UC123")
        .body(Body::empty())
        .unwrap();
    let (status, json) = parse_body(app.oneshot(request).await.unwrap()).await;

    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(json, upstream);
}

#[tokio::test]
async fn test_channel_requires_channel_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_with_youtube(&server.uri());
    for uri in ["/youtube-channel", "/youtube-channel?channelId="] {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, json) = parse_body(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_channel_propagates_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/channels"))
        .respond_with(ResponseTemplate::new(404).set_body_string("channel not found"))
        .mount(&server)
        .await;

    let app = app_with_youtube(&server.uri());
    let request = Request::get("/youtube-channel?channelId=UCnope")
        .body(Body::empty())
        .unwrap();
    let (status, json) = parse_body(app.oneshot(request).await.unwrap()).await;

    assert_eq!(status, http::StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "UPSTREAM_FAILURE");
}
