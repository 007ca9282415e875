//! Health and readiness endpoints.

use axum::Json;
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
}

/// Liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness probe.
pub async fn readiness_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ready" })
}
