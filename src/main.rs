//! Gateway entrypoint.
//!
//! JSON logs in production, pretty logs (plus `.env` loading) locally.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use syncro_gateway::config::Config;
use syncro_gateway::{AppState, create_app};

#[tokio::main]
async fn main() {
    // Load .env for local dev before reading configuration
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    if config.environment.is_production() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    // Relay client: cookies are forwarded per-request, never stored, and
    // upstream redirects are relayed to the browser, not followed here.
    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build HTTP client");

    let state = Arc::new(AppState {
        config: config.clone(),
        http_client,
    });

    let app = create_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(backend = %config.backend_origin, "Starting Syncro gateway on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
