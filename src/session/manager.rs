//! Session lifecycle orchestration.
//!
//! One `SessionManager` runs per browsing context. While started it keeps the
//! session fresh from three directions: a recurring timer tuned to the token
//! lifetime, route changes, and the context becoming visible again (laptop
//! wake, tab switch — situations where the timer may have been suspended).
//! It also hosts the cross-context sign-out listener.
//!
//! `start()`/`stop()` bracket the maintenance work; dropping the manager
//! stops it too. An in-flight refresh is never aborted by `stop()` — it
//! settles on its own task inside the refresher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::redirect::sign_in_redirect_url;
use crate::session::refresher::{RefreshOutcome, SessionRefresher};
use crate::session::shell::{Location, Shell};
use crate::session::signout::{SignOutChannel, Subscription};

/// Route that never triggers session maintenance.
pub const PUBLIC_LANDING: &str = "/";

/// How a refresh outcome is acted on. Cloned into the background tasks so
/// they do not keep the manager itself alive.
#[derive(Clone)]
struct RefreshPolicy {
    refresher: SessionRefresher,
    shell: Arc<dyn Shell>,
    location: Arc<Location>,
    sign_in_url: String,
    allowed_redirect_origins: Arc<[String]>,
}

impl RefreshPolicy {
    async fn run(&self) {
        match self.refresher.refresh_detailed().await {
            RefreshOutcome::Renewed => {}
            RefreshOutcome::Unauthorized => {
                let current = self.location.get();
                tracing::warn!("session expired, redirecting to sign-in");
                self.shell.navigate(&sign_in_redirect_url(
                    &self.sign_in_url,
                    Some(&current),
                    &self.allowed_redirect_origins,
                ));
            }
            RefreshOutcome::Failed => {
                tracing::warn!("session refresh failed; retrying on next scheduled trigger");
            }
        }
    }
}

#[derive(Default)]
struct ManagerTasks {
    timer: Option<JoinHandle<()>>,
    startup: Option<JoinHandle<()>>,
    listener: Option<Subscription>,
}

/// Background session maintenance for one browsing context.
pub struct SessionManager {
    policy: RefreshPolicy,
    channel: SignOutChannel,
    refresh_interval: Duration,
    tasks: Mutex<ManagerTasks>,
}

impl SessionManager {
    pub fn new(
        refresher: SessionRefresher,
        shell: Arc<dyn Shell>,
        location: Arc<Location>,
        channel: SignOutChannel,
        config: &Config,
    ) -> Self {
        Self {
            policy: RefreshPolicy {
                refresher,
                shell,
                location,
                sign_in_url: config.sign_in_url(),
                allowed_redirect_origins: config.allowed_redirect_origins.clone().into(),
            },
            channel,
            refresh_interval: config.refresh_interval(),
            tasks: Mutex::new(ManagerTasks::default()),
        }
    }

    /// Begin maintenance: register the sign-out listener, refresh immediately
    /// (unless the context sits on the public landing page), and start the
    /// recurring refresh timer. Calling `start` on a started manager is a
    /// no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().expect("manager task lock poisoned");
        if tasks.timer.is_some() {
            return;
        }

        tasks.listener = Some(self.channel.listen(
            Arc::clone(&self.policy.shell),
            self.policy.sign_in_url.clone(),
        ));

        if self.policy.location.path() != PUBLIC_LANDING {
            let policy = self.policy.clone();
            tasks.startup = Some(tokio::spawn(async move { policy.run().await }));
        }

        let policy = self.policy.clone();
        let period = self.refresh_interval;
        tasks.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // A suspended timer must not burst on resume; the visibility
            // trigger covers the catch-up refresh.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // first tick completes immediately
            loop {
                ticker.tick().await;
                tracing::debug!("scheduled session refresh");
                policy.run().await;
            }
        }));
    }

    /// Stop maintenance: cancel the timer and unsubscribe the sign-out
    /// listener. Does not abort a refresh already in flight.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock().expect("manager task lock poisoned");
        if let Some(timer) = tasks.timer.take() {
            timer.abort();
        }
        if let Some(startup) = tasks.startup.take() {
            startup.abort();
        }
        tasks.listener = None;
    }

    pub fn is_active(&self) -> bool {
        self.tasks
            .lock()
            .expect("manager task lock poisoned")
            .timer
            .is_some()
    }

    /// The context navigated to `url`: record it and revalidate the session,
    /// except on the public landing page.
    pub async fn handle_route_change(&self, url: &str) {
        self.policy.location.set(url);
        if self.policy.location.path() == PUBLIC_LANDING {
            return;
        }
        self.policy.run().await;
    }

    /// The context's visibility changed; a newly-visible context revalidates
    /// immediately since its timer may have been suspended the whole time.
    pub async fn handle_visibility_change(&self, visible: bool) {
        if !visible {
            return;
        }
        tracing::debug!("context became visible, checking session");
        self.policy.run().await;
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}
