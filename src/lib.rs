//! Syncro edge gateway — same-origin auth relay and session lifecycle.
//!
//! The gateway binary serves the admin UI bundle behind the
//! [`middleware::gatekeeper`] and relays `/api/*` to the backend through
//! [`routes::proxy`], keeping the identity provider's cookies first-party.
//! The [`session`] modules are the client-side half of the system: they run
//! inside the UI shell's process and keep the cookie session alive.

pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod redirect;
pub mod routes;
pub mod session;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::gatekeeper::gatekeeper;

/// Shared application state available to all route handlers.
///
/// The HTTP client is the relay client: no cookie store, no redirect
/// following. Cookies cross the gateway only as per-request header bytes.
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
}

/// Build the Axum router with all middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    // CORS: allow the app origin with credentials, for split-origin dev
    // setups where the UI dev server runs apart from the gateway.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(
            state.config.app_origin.parse().unwrap(),
        ))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true);

    // The proxy must stay reachable without authentication: it performs no
    // authorization of its own, the backend does that on arrival.
    let api = Router::new()
        .route("/{*path}", any(routes::proxy::proxy))
        .with_state(state.clone());

    // Admin UI bundle with SPA index fallback, behind the gatekeeper.
    let ui_dir = Path::new(&state.config.ui_dir);
    let pages = Router::new()
        .fallback_service(
            ServeDir::new(ui_dir).not_found_service(ServeFile::new(ui_dir.join("index.html"))),
        )
        .layer(from_fn_with_state(state.clone(), gatekeeper));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", api)
        .merge(pages)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
