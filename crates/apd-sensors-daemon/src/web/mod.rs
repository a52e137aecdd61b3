//! HTTP API module.

mod auth;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;

use apd_sensors::error::UNHANDLED_MESSAGE;
use apd_sensors::TimeRange;

use crate::state::AppState;

/// Creates the web router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/sensors/", get(sensor_values))
        .route("/sensors/:sensor_id", get(sensor_value))
        .route("/info/sensors", get(sensor_types))
        .route("/historical", get(historical_all))
        .route("/historical/:start", get(historical_values))
        .route("/historical/:start/:end", get(historical_values))
        .route("/sensors/:sensor_id/historical", get(historical_values))
        .route("/sensors/:sensor_id/historical/:start", get(historical_values))
        .route(
            "/sensors/:sensor_id/historical/:start/:end",
            get(historical_values),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .merge(api)
        .route("/deployment_id", get(deployment_id))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'"),
        ))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

/// All sensor values.
async fn sensor_values(State(state): State<Arc<AppState>>) -> Response {
    collect_response(state, None).await
}

/// Values of the sensors with the given id.
async fn sensor_value(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> Response {
    collect_response(state, Some(sensor_id)).await
}

async fn collect_response(state: Arc<AppState>, sensor_id: Option<String>) -> Response {
    // Sensors block on file reads and sampling delays.
    match tokio::task::spawn_blocking(move || state.collect(sensor_id.as_deref())).await {
        Ok(collection) => Json(collection).into_response(),
        Err(e) => {
            error!("Sensor collection task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, UNHANDLED_MESSAGE)
        }
    }
}

/// Map of sensor id to title.
async fn sensor_types(State(state): State<Arc<AppState>>) -> Json<BTreeMap<&'static str, &'static str>> {
    Json(state.known_sensors().into_iter().collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HistoricalParams {
    sensor_id: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

async fn historical_all(State(state): State<Arc<AppState>>) -> Response {
    historical_response(state, HistoricalParams::default()).await
}

async fn historical_values(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HistoricalParams>,
) -> Response {
    historical_response(state, params).await
}

fn parse_bound(text: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>, Response> {
    match text {
        None => Ok(None),
        Some(text) => TimeRange::parse_bound(text).map(Some).ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("Could not parse date: {}", text),
            )
        }),
    }
}

async fn historical_response(state: Arc<AppState>, params: HistoricalParams) -> Response {
    let start = match parse_bound(params.start.as_deref()) {
        Ok(start) => start,
        Err(response) => return response,
    };
    let end = match parse_bound(params.end.as_deref()) {
        Ok(end) => end,
        Err(response) => return response,
    };
    let range = TimeRange::between(start, end);
    let sensor_id = params.sensor_id;

    let result =
        tokio::task::spawn_blocking(move || state.historical(sensor_id.as_deref(), &range)).await;
    match result {
        Ok(Ok(values)) => Json(json!({"sensors": values})).into_response(),
        Ok(Err(e)) => {
            error!("Could not read historical data: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, UNHANDLED_MESSAGE)
        }
        Err(e) => {
            error!("Historical data task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, UNHANDLED_MESSAGE)
        }
    }
}

/// Deployment identifier, available without an API key.
async fn deployment_id(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({"deployment_id": state.deployment_id()}))
}
