//! Test utilities: gateway builder, mock-backend config, recording shell.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use syncro_gateway::config::Config;
use syncro_gateway::session::shell::Shell;
use syncro_gateway::{AppState, create_app};

/// Production-mode config whose backend is the given (wiremock) origin.
/// Sign-in links still point at the real identity origin so redirects are
/// assertable.
pub fn config_with_backend(backend: &str) -> Config {
    let mut config = Config::test_default();
    config.backend_origin = backend.trim_end_matches('/').to_string();
    config
}

/// Build the full gateway router the way `main` does.
pub fn build_gateway(config: Config) -> axum::Router {
    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build HTTP client");
    create_app(Arc::new(AppState {
        config,
        http_client,
    }))
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Shell that records what the engine asked the host to do.
#[derive(Default)]
pub struct RecordingShell {
    navigations: Mutex<Vec<String>>,
    storage_clears: AtomicUsize,
}

impl RecordingShell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn storage_clears(&self) -> usize {
        self.storage_clears.load(Ordering::SeqCst)
    }
}

impl Shell for RecordingShell {
    fn navigate(&self, url: &str) {
        self.navigations.lock().unwrap().push(url.to_string());
    }

    fn clear_storage(&self) {
        self.storage_clears.fetch_add(1, Ordering::SeqCst);
    }
}
