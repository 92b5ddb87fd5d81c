//! Host-shell seam: the browsing-context side effects the session engine
//! triggers but cannot own.

use std::sync::RwLock;

/// Navigation and storage operations of the hosting context.
///
/// The engine calls these on sign-out and on unrecoverable auth failures;
/// what "navigate" means (webview load, window relocation) is the host's
/// business.
pub trait Shell: Send + Sync + 'static {
    /// Point the current context at `url`.
    fn navigate(&self, url: &str);

    /// Clear the context's local and session storage.
    fn clear_storage(&self);
}

/// Shell for hosts without navigation or storage. Logs what it would have
/// done so the degraded mode is observable.
pub struct HeadlessShell;

impl Shell for HeadlessShell {
    fn navigate(&self, url: &str) {
        tracing::warn!(url, "no shell attached; navigation dropped");
    }

    fn clear_storage(&self) {
        tracing::warn!("no shell attached; storage clear dropped");
    }
}

/// Shared "where is the user right now" cell.
///
/// Updated by the session manager on route changes, read whenever a sign-in
/// redirect needs the current URL as its return target.
pub struct Location {
    url: RwLock<String>,
}

impl Location {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            url: RwLock::new(initial.into()),
        }
    }

    pub fn get(&self) -> String {
        self.url.read().expect("location lock poisoned").clone()
    }

    pub fn set(&self, url: impl Into<String>) {
        *self.url.write().expect("location lock poisoned") = url.into();
    }

    /// Path component of the current URL ("/" when it cannot be parsed).
    pub fn path(&self) -> String {
        let current = self.get();
        url::Url::parse(&current)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".into())
    }
}
