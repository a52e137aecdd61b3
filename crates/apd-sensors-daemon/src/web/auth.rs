//! API key check for protected routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Rejects requests without the configured key in the X-API-Key header.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let supplied = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if supplied.is_empty()
        || !constant_time_compare(state.api_key().as_bytes(), supplied.as_bytes())
    {
        debug!("Rejected request to {} without valid API key", request.uri().path());
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Supply API key in X-API-Key header"})),
        )
            .into_response();
    }

    next.run(request).await
}

/// Compares two byte strings without an early exit on the first difference.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
