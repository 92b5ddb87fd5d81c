//! Application error types with Axum response mapping.
//!
//! Every variant renders as the `{success: false, error: ...}` envelope the
//! backend uses, so callers see one failure shape regardless of whether the
//! gateway or the upstream produced it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Relaying a request to the backend failed. The cause is logged
    /// server-side; the response body stays generic.
    #[error("Proxy request failed")]
    ProxyFailed,

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::ProxyFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"success": false, "error": "Proxy request failed"}),
            ),
            AppError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({"success": false, "error": "Request body too large"}),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"success": false, "error": msg}),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
