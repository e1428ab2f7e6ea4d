//! REST surface tests, driven through the router without a socket.

use std::sync::Arc;

use apk_scout::{Scout, ScoutConfig};
use apk_scout_server::{router, AppState, ServerConfig};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scout_config(mirror: &str, canonical: &str) -> ScoutConfig {
    let mut config = ScoutConfig::default();
    config.site.canonical_base = canonical.to_string();
    config.site.mirror_base = mirror.to_string();
    config.site.download_hosts = vec!["gamercdn.top".to_string()];
    config.fetch.max_attempts = 2;
    config.fetch.base_delay_ms = 1;
    config.fetch.max_delay_ms = 2;
    config
}

fn app(config: ScoutConfig) -> axum::Router {
    let server = ServerConfig::resolve_with(None, None, Some(10), |_| None);
    let scout = Scout::new(config).unwrap();
    router(Arc::new(AppState::new(scout, &server)))
}

fn offline_app() -> axum::Router {
    app(scout_config("http://127.0.0.1:9", "http://127.0.0.1:9"))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn test_root_describes_usage() {
    let (status, body) = get(offline_app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert!(body["example_usage"].as_str().unwrap().starts_with("/search?query="));
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(offline_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_query_is_bad_request() {
    let (status, body) = get(offline_app(), "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "E_INVALID_PARAMS");
}

#[tokio::test]
async fn test_blank_query_is_bad_request() {
    let (status, _) = get(offline_app(), "/search?query=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_limit_above_maximum_is_bad_request() {
    let (status, body) = get(offline_app(), "/search?query=minecraft&limit=11").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("11"));
}

#[tokio::test]
async fn test_non_numeric_limit_is_bad_request() {
    let (status, body) = get(offline_app(), "/search?query=minecraft&limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E_INVALID_PARAMS");
}

#[tokio::test]
async fn test_search_returns_results() {
    let mirror = MockServer::start().await;
    let canonical = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/minecraft"))
        .respond_with(html(
            r#"<html><body><h1 class="column-title">Results</h1>
            <a class="column-games-item" href="/minecraft">
              <img class="column-games-item-icon" data-src="/img/mc.png">
              <div class="column-games-item-info-name">Minecraft</div>
              <div class="column-games-item-info-version">v1.21 + 250 MB</div>
            </a></body></html>"#
                .to_string(),
        ))
        .mount(&mirror)
        .await;
    Mock::given(method("GET"))
        .and(path("/minecraft"))
        .respond_with(html(
            r#"<html><body><a class="apk-download-btn" href="/minecraft/download">Get</a></body></html>"#
                .to_string(),
        ))
        .mount(&mirror)
        .await;
    Mock::given(method("GET"))
        .and(path("/minecraft/download"))
        .respond_with(html(
            r#"<html><body><div class="download-btn-box"></div>
            <script id="__NUXT_DATA__" type="application/json">["https://gamercdn.top/download/mc.apk",1]</script>
            </body></html>"#
                .to_string(),
        ))
        .mount(&mirror)
        .await;

    let (status, body) = get(
        app(scout_config(&mirror.uri(), &canonical.uri())),
        "/search?query=minecraft&limit=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["query"], "minecraft");
    assert_eq!(body["count"], 1);
    assert_eq!(body["failed"], 0);
    let item = &body["results"][0];
    assert_eq!(item["name"], "Minecraft");
    assert_eq!(item["size"], "250 MB");
    assert_eq!(item["image"], format!("{}/img/mc.png", canonical.uri()));
    assert_eq!(item["download"], "https://gamercdn.top/download/mc.apk");
}

#[tokio::test]
async fn test_exhausted_listing_is_gateway_timeout() {
    let mirror = MockServer::start().await;
    let canonical = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/minecraft"))
        .respond_with(html("<html><body>checking your browser</body></html>".to_string()))
        .expect(2)
        .mount(&mirror)
        .await;

    let (status, body) = get(
        app(scout_config(&mirror.uri(), &canonical.uri())),
        "/search?query=minecraft",
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["code"], "E_UPSTREAM_TIMEOUT");
}
