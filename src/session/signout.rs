//! Cross-context sign-out propagation.
//!
//! Signing out in one tab must sign out every open tab of the application.
//! The engine broadcasts a `SIGN_OUT` message on the shared `auth` channel;
//! each listener independently clears its storage and navigates to sign-in
//! without re-broadcasting, so there is no echo loop. A host without a
//! broadcast primitive degrades to single-context sign-out with a warning.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::session::shell::Shell;

/// Logical name of the sign-out channel.
pub const CHANNEL_NAME: &str = "auth";

const CHANNEL_CAPACITY: usize = 16;

/// Messages carried on the `auth` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthMessage {
    #[serde(rename = "SIGN_OUT")]
    SignOut,
}

/// Broadcast channel connecting every browsing context of the application.
#[derive(Clone)]
pub struct SignOutChannel {
    tx: Option<broadcast::Sender<AuthMessage>>,
}

impl SignOutChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx: Some(tx) }
    }

    /// Channel for hosts without a broadcast primitive: every operation is a
    /// no-op and sign-out stays local to the current context.
    pub fn unavailable() -> Self {
        tracing::warn!(
            channel = CHANNEL_NAME,
            "broadcast unavailable; sign-out will not propagate to other contexts"
        );
        Self { tx: None }
    }

    pub fn is_available(&self) -> bool {
        self.tx.is_some()
    }

    /// Post a message to every listening context. Posting with no listeners
    /// (or no channel) is fine — a context opened later discovers the missing
    /// session on its next request instead.
    pub fn post(&self, message: AuthMessage) {
        let Some(tx) = &self.tx else {
            tracing::warn!(channel = CHANNEL_NAME, "dropping message: broadcast unavailable");
            return;
        };
        if tx.send(message).is_err() {
            tracing::debug!(channel = CHANNEL_NAME, "no listeners for message");
        }
    }

    /// Register this context's sign-out handler: clear storage and navigate
    /// to `sign_in_url` when another context signs out.
    ///
    /// The returned [`Subscription`] unsubscribes on drop.
    pub fn listen(&self, shell: Arc<dyn Shell>, sign_in_url: String) -> Subscription {
        let Some(tx) = &self.tx else {
            return Subscription { task: None };
        };

        let mut rx = tx.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthMessage::SignOut) => {
                        tracing::info!("received sign-out from another context");
                        shell.clear_storage();
                        shell.navigate(&sign_in_url);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "sign-out listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription { task: Some(task) }
    }
}

impl Default for SignOutChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle keeping a sign-out listener alive; dropping it unsubscribes.
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Sign out everywhere: tell the backend, wipe this context, notify the
/// others, land on sign-in.
///
/// The backend call is best-effort — local cleanup and the redirect happen
/// even when it fails, because a dead backend must never trap the user in a
/// half-signed-out state.
pub async fn global_sign_out(
    http: &reqwest::Client,
    config: &Config,
    shell: &Arc<dyn Shell>,
    channel: &SignOutChannel,
) {
    match http.post(config.sign_out_url()).send().await {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("backend sign-out acknowledged");
        }
        Ok(resp) => {
            tracing::warn!(status = %resp.status(), "backend sign-out rejected");
        }
        Err(err) => {
            tracing::warn!(error = %err, "backend sign-out call failed");
        }
    }

    shell.clear_storage();
    channel.post(AuthMessage::SignOut);
    shell.navigate(&config.sign_in_url());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_out_wire_shape() {
        let json = serde_json::to_value(AuthMessage::SignOut).unwrap();
        assert_eq!(json, serde_json::json!({"type": "SIGN_OUT"}));

        let parsed: AuthMessage =
            serde_json::from_value(serde_json::json!({"type": "SIGN_OUT"})).unwrap();
        assert_eq!(parsed, AuthMessage::SignOut);
    }

    #[test]
    fn test_post_without_listeners_is_silent() {
        let channel = SignOutChannel::new();
        channel.post(AuthMessage::SignOut);
    }

    #[test]
    fn test_unavailable_channel_is_noop() {
        let channel = SignOutChannel::unavailable();
        assert!(!channel.is_available());
        channel.post(AuthMessage::SignOut);
    }
}
