//! Observability HTTP Routes
//!
//! Health check and the metrics counters of the running library.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::errors::ApiResult;
use crate::library::Library;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Create observability routes
pub fn observability_routes(library: Arc<Library>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/counters", get(counters_handler))
        .with_state(library)
}

/// Health check route (also available at root /health)
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(library): State<Arc<Library>>) -> impl IntoResponse {
    (StatusCode::OK, Json(library.metrics().snapshot()))
}

/// Current value of every id counter
async fn counters_handler(
    State(library): State<Arc<Library>>,
) -> ApiResult<Json<serde_json::Value>> {
    let counters = library.counters()?;
    Ok(Json(serde_json::json!({ "counters": counters })))
}
