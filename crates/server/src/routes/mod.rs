//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `digests`: submitting URLs and polling for finished digests

pub mod digests;
pub mod health;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (`GET /`).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "vdigest",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "POST /api/v1/digests",
            "GET /api/v1/digests?requestId=",
            "GET /api/v1/digests/{id}",
            "GET /api/v1/digests/by-request/{request_id}",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
