//! # muxrpc-transport
//!
//! Connections that carry muxrpc frames.
//!
//! This crate provides:
//! - The `Connection` trait and its `ConnectionObserver` callbacks
//! - A TCP connection with a background reader and writer
//! - An in-process connection pair for tests and embedding

pub mod connection;
pub mod error;
pub mod memory;
pub mod tcp;

pub use connection::{Connection, ConnectionObserver, LinkState};
pub use error::TransportError;
pub use memory::MemoryConnection;
pub use tcp::{TcpConfig, TcpConnection};
