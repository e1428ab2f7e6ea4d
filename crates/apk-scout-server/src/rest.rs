//! HTTP REST API.
//!
//! `GET /search?query=…&limit=…` runs one search through the shared
//! [`Scout`] and returns the aggregate response, with per-item failures
//! listed next to the results.

use apk_scout::{Scout, SearchResponse};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::error::ApiError;

/// State shared by every handler.
pub struct AppState {
    pub scout: Scout,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl AppState {
    pub fn new(scout: Scout, config: &ServerConfig) -> Self {
        Self {
            scout,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/search", get(handle_search))
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C, then return so the caller can release the client.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

// ── Handlers ────────────────────────────────────────────────────

async fn root() -> Json<Value> {
    Json(serde_json::json!({
        "message": "Search API for the APK catalog",
        "example_usage": "/search?query=minecraft&limit=5",
    }))
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize, Default)]
struct SearchParams {
    query: Option<String>,
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::InvalidParams(e.body_text()))?;

    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::InvalidParams("query is required".into()))?;

    let limit = params.limit.unwrap_or(state.default_limit);
    if limit > state.max_limit {
        return Err(ApiError::InvalidParams(format!(
            "limit {limit} exceeds the maximum of {}",
            state.max_limit
        )));
    }

    let response = state.scout.search(query, limit).await?;
    Ok(Json(response))
}
