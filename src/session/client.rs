//! Backend request decoration: refresh-and-retry on 401, envelope decoding.
//!
//! `AuthClient` is how the UI layer talks to the backend. A 401 triggers one
//! session refresh and one retry; a failed refresh sends the shell to the
//! sign-in page with the current location as the (validated) return target.
//! Either way the caller gets a response back — never a panic, never a loop.

use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::redirect::sign_in_redirect_url;
use crate::session::refresher::SessionRefresher;
use crate::session::shell::{Location, Shell};
use crate::types::{Envelope, EnvelopeError};

#[derive(Debug, thiserror::Error)]
pub enum AuthClientError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        details: Option<serde_json::Value>,
    },
}

/// HTTP client decorator for session-cookie-authenticated backend calls.
pub struct AuthClient {
    refresher: SessionRefresher,
    shell: Arc<dyn Shell>,
    location: Arc<Location>,
    sign_in_url: String,
    allowed_redirect_origins: Vec<String>,
}

impl AuthClient {
    pub fn new(
        refresher: SessionRefresher,
        shell: Arc<dyn Shell>,
        location: Arc<Location>,
        config: &Config,
    ) -> Self {
        Self {
            refresher,
            shell,
            location,
            sign_in_url: config.sign_in_url(),
            allowed_redirect_origins: config.allowed_redirect_origins.clone(),
        }
    }

    /// Perform `req`, refreshing the session and retrying exactly once on 401.
    ///
    /// Outcomes:
    /// - non-401 response: returned as-is (including other error statuses);
    /// - 401, refresh succeeds: the retried response, whatever its status;
    /// - 401, refresh fails: the shell is navigated to sign-in and the
    ///   original 401 is returned so the caller can unwind normally.
    ///
    /// At most two network attempts happen per call.
    pub async fn request_with_refresh(
        &self,
        req: RequestBuilder,
    ) -> Result<Response, AuthClientError> {
        let retry = req.try_clone();
        let response = req.send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("request returned 401, attempting session refresh");
        if self.refresher.refresh().await {
            match retry {
                Some(retry) => return Ok(retry.send().await?),
                None => {
                    // Streaming bodies cannot be replayed; surface the 401.
                    tracing::warn!("session refreshed but request body is not replayable");
                    return Ok(response);
                }
            }
        }

        tracing::warn!("session refresh failed, redirecting to sign-in");
        self.shell.navigate(&self.sign_in_redirect());
        Ok(response)
    }

    /// Perform `req` and decode the backend's `{success, data | error}`
    /// envelope into the domain value it carries.
    ///
    /// Endpoints that answer without the envelope fall back to plain status
    /// handling: 2xx parses the body as `T`, anything else is an API error
    /// carrying the body text.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, AuthClientError> {
        let response = self.request_with_refresh(req).await?;
        let status = response.status();

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        if is_json {
            let body: serde_json::Value = response.json().await?;
            if body.get("success").is_some() {
                let envelope: Envelope<T> = serde_json::from_value(body)
                    .map_err(|err| AuthClientError::Api {
                        status,
                        message: format!("malformed response envelope: {err}"),
                        details: None,
                    })?;
                return envelope.into_result().map_err(|err| match err {
                    EnvelopeError::Api { message, details } => AuthClientError::Api {
                        status,
                        message,
                        details,
                    },
                    EnvelopeError::MissingData => AuthClientError::Api {
                        status,
                        message: "success envelope without data".into(),
                        details: None,
                    },
                });
            }
            if status.is_success() {
                return serde_json::from_value(body).map_err(|err| AuthClientError::Api {
                    status,
                    message: format!("unexpected response shape: {err}"),
                    details: None,
                });
            }
            return Err(AuthClientError::Api {
                status,
                message: body
                    .get("error")
                    .or_else(|| body.get("message"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown error")
                    .into(),
                details: None,
            });
        }

        let text = response.text().await.unwrap_or_default();
        Err(AuthClientError::Api {
            status,
            message: if text.is_empty() {
                "Unknown error".into()
            } else {
                text
            },
            details: None,
        })
    }

    fn sign_in_redirect(&self) -> String {
        let current = self.location.get();
        sign_in_redirect_url(
            &self.sign_in_url,
            Some(&current),
            &self.allowed_redirect_origins,
        )
    }
}
