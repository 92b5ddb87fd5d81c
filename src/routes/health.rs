//! GET /health

use axum::Json;

use crate::types::HealthResponse;

/// Liveness probe. Never gatekept, never proxied.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: "gateway",
    })
}
