//! Identity backend integration.

pub mod client;
