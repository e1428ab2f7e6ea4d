//! API errors and their HTTP mapping.

use apk_scout::ScoutError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Error codes carried in the JSON error body.
pub mod error_codes {
    pub const INVALID_PARAMS: &str = "E_INVALID_PARAMS";
    pub const UPSTREAM_TIMEOUT: &str = "E_UPSTREAM_TIMEOUT";
    pub const UPSTREAM_REJECTED: &str = "E_UPSTREAM_REJECTED";
    pub const INTERNAL: &str = "E_INTERNAL";
}

/// All errors a request handler can return.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Scout(#[from] ScoutError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ApiError::Scout(ScoutError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ApiError::Scout(ScoutError::ValidationTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Scout(ScoutError::UpstreamRejected { .. })
            | ApiError::Scout(ScoutError::Unfetchable { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Scout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        use error_codes::*;
        match self {
            ApiError::InvalidParams(_) | ApiError::Scout(ScoutError::InvalidQuery(_)) => {
                INVALID_PARAMS
            }
            ApiError::Scout(ScoutError::ValidationTimeout { .. }) => UPSTREAM_TIMEOUT,
            ApiError::Scout(ScoutError::UpstreamRejected { .. })
            | ApiError::Scout(ScoutError::Unfetchable { .. }) => UPSTREAM_REJECTED,
            ApiError::Scout(_) => INTERNAL,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "request failed");
        }
        let body = serde_json::json!({
            "success": false,
            "error": { "code": self.code(), "message": self.to_string() }
        });
        (status, Json(body)).into_response()
    }
}
