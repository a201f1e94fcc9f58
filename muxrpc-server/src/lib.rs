//! # muxrpc-server
//!
//! Serving side of muxrpc.
//!
//! This crate provides:
//! - A concurrent registry of handlers keyed by operation name
//! - Call dispatch with before/after/finalizer hooks and an error observer
//! - A TCP listener attaching a service to every accepted connection
//! - YAML + environment configuration

pub mod config;
pub mod error;
pub mod listener;
pub mod options;
pub mod registry;
pub mod service;

pub use config::{Config, ConfigError, NetworkConfig, TransportConfig};
pub use error::ServerError;
pub use listener::{Listener, ServerStats};
pub use options::ServiceOptions;
pub use registry::{Handler, HandlerRegistry};
pub use service::{Service, ServiceBridge};
