//! Shared request/response DTOs.
//!
//! The backend wraps every JSON response in a `{success, data | error}`
//! envelope; `Envelope<T>` is that contract on this side of the wire.

use serde::{Deserialize, Serialize};

/// The backend's uniform response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T> Envelope<T> {
    /// Unwrap the envelope into the domain result it carries.
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if self.success {
            self.data.ok_or(EnvelopeError::MissingData)
        } else {
            Err(EnvelopeError::Api {
                message: self
                    .error
                    .unwrap_or_else(|| "Unknown error".into()),
                details: self.details,
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("{message}")]
    Api {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("success envelope without data")]
    MissingData,
}

/// The user identity the backend resolves from session cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: &'static str,
}
