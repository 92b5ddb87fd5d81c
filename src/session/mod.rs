//! Client-side session lifecycle engine.
//!
//! Keeps a server-issued cookie session alive for as long as the application
//! is open: single-flight refresh ([`refresher`]), 401-retry request
//! decoration ([`client`]), cross-context sign-out broadcast ([`signout`]),
//! and the timer/visibility/route-change orchestrator ([`manager`]).
//!
//! The engine never reads token contents — the session is an opaque cookie
//! pair owned by the identity provider, carried automatically by a
//! cookie-store-enabled `reqwest::Client`.

pub mod client;
pub mod manager;
pub mod refresher;
pub mod shell;
pub mod signout;

pub use refresher::{RefreshOutcome, SessionRefresher};
pub use shell::{HeadlessShell, Location, Shell};
