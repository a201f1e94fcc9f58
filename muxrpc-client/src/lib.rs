//! # muxrpc-client
//!
//! Calling side of muxrpc.
//!
//! This crate provides:
//! - A correlation table matching result frames to waiting calls
//! - Call dispatch with before/after/finalizer hooks and an error observer
//! - Optional per-call timeouts and cancellation
//! - Connection readiness signals (`wait_connected` / `wait_closed`)

pub mod client;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod pending;
pub mod readiness;

pub use client::{Client, Endpoint};
pub use error::ClientError;
pub use lifecycle::ClientBridge;
pub use options::ClientOptions;
pub use pending::PendingCallTable;
pub use readiness::Readiness;
