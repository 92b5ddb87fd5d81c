//! ANY /api/{*path}
//!
//! Same-origin relay to the backend. The browser talks to its own origin, so
//! the session cookies the backend sets stay first-party; the relay's whole
//! job is to move bytes without understanding them. Cookies are forwarded
//! per-request from the incoming header — the proxy client keeps no cookie
//! store and follows no redirects, so nothing leaks between callers.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{Method, header};
use axum::response::{IntoResponse, Response};

use crate::AppState;
use crate::error::AppError;

/// Largest request body the relay will buffer.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Methods forwarded without a body.
fn is_bodyless(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD || *method == Method::DELETE
}

pub async fn proxy(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    req: Request,
) -> Response {
    match forward(&state, &path, req).await {
        Ok(response) => response,
        Err(ProxyError::BodyTooLarge) => AppError::BodyTooLarge.into_response(),
        Err(err) => {
            tracing::error!(error = %err, path, "proxy request failed");
            AppError::ProxyFailed.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    path: &str,
    req: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = req.into_parts();

    let mut upstream_url = format!("{}/api/{}", state.config.backend_origin, path);
    if let Some(query) = parts.uri.query() {
        upstream_url.push('?');
        upstream_url.push_str(query);
    }

    tracing::debug!(
        method = %parts.method,
        url = %upstream_url,
        has_cookies = parts.headers.contains_key(header::COOKIE),
        "proxying request"
    );

    let mut upstream = state
        .http_client
        .request(parts.method.clone(), &upstream_url);

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");
    upstream = upstream.header(header::CONTENT_TYPE, content_type);

    if let Some(cookies) = parts.headers.get(header::COOKIE) {
        upstream = upstream.header(header::COOKIE, cookies.clone());
    }

    if !is_bodyless(&parts.method) {
        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| ProxyError::BodyTooLarge)?;
        if !bytes.is_empty() {
            upstream = upstream.body(bytes);
        }
    }

    let response = upstream.send().await?;

    let status = response.status();
    tracing::debug!(
        status = %status,
        has_set_cookie = response.headers().contains_key(header::SET_COOKIE),
        "proxied response"
    );

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = response.headers().get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    for set_cookie in response.headers().get_all(header::SET_COOKIE) {
        builder = builder.header(header::SET_COOKIE, set_cookie);
    }

    let bytes = response.bytes().await?;
    builder
        .body(Body::from(bytes))
        .map_err(|err| ProxyError::Response(err.to_string()))
}

#[derive(Debug, thiserror::Error)]
enum ProxyError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("request body exceeds relay limit")]
    BodyTooLarge,

    #[error("failed to assemble relayed response: {0}")]
    Response(String),
}
