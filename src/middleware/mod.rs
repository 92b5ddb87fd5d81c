//! Request middleware.

pub mod gatekeeper;
