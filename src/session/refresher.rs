//! Single-flight session refresh.
//!
//! Every trigger in the engine (timer tick, visibility change, route change,
//! 401 retry) funnels through one `SessionRefresher`. If a refresh is already
//! in flight when another trigger fires, the new caller joins it and observes
//! the same outcome — the backend never sees two simultaneous refresh calls
//! from one context, which matters because the identity provider rotates
//! cookies on refresh.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

/// What a refresh attempt concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The backend renewed the session (2xx).
    Renewed,
    /// The refresh endpoint itself said 401 — the session is gone.
    Unauthorized,
    /// Transport error or unexpected status; worth retrying later.
    Failed,
}

impl RefreshOutcome {
    pub fn is_renewed(self) -> bool {
        self == RefreshOutcome::Renewed
    }
}

type SharedOutcome = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Session renewal client with single-flight de-duplication.
///
/// Cheap to clone; clones share the in-flight slot.
#[derive(Clone)]
pub struct SessionRefresher {
    inner: Arc<RefresherInner>,
}

struct RefresherInner {
    http: reqwest::Client,
    refresh_url: String,
    in_flight: Mutex<Option<SharedOutcome>>,
}

impl SessionRefresher {
    /// `http` must carry the session cookies (a cookie-store client).
    pub fn new(http: reqwest::Client, refresh_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                http,
                refresh_url: refresh_url.into(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Renew the session. `true` means renewed.
    pub async fn refresh(&self) -> bool {
        self.refresh_detailed().await.is_renewed()
    }

    /// Renew the session, reporting why it failed when it does.
    ///
    /// Concurrent callers share the in-flight attempt and its outcome; the
    /// slot is cleared once the network call settles, so a later call starts
    /// a fresh attempt. The call runs on its own task and completes even if
    /// every caller is dropped mid-await.
    pub async fn refresh_detailed(&self) -> RefreshOutcome {
        let shared = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .expect("refresh slot lock poisoned");
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let handle = tokio::spawn(async move {
                        let outcome = inner.execute().await;
                        inner
                            .in_flight
                            .lock()
                            .expect("refresh slot lock poisoned")
                            .take();
                        outcome
                    });
                    let shared: SharedOutcome =
                        async move { handle.await.unwrap_or(RefreshOutcome::Failed) }
                            .boxed()
                            .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        shared.await
    }
}

impl RefresherInner {
    async fn execute(&self) -> RefreshOutcome {
        match self.http.post(&self.refresh_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("session refreshed");
                RefreshOutcome::Renewed
            }
            Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                tracing::warn!("session refresh rejected: not authenticated");
                RefreshOutcome::Unauthorized
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "session refresh failed");
                RefreshOutcome::Failed
            }
            Err(err) => {
                tracing::warn!(error = %err, "session refresh request failed");
                RefreshOutcome::Failed
            }
        }
    }
}
