//! # muxrpc-protocol
//!
//! Wire protocol implementation for muxrpc.
//!
//! This crate provides:
//! - Call and result frames with explicit length validation
//! - A `u32` length envelope for byte-stream transports
//! - Correlation id generation
//! - The call context threaded through client and service hooks

pub mod codec;
pub mod context;
pub mod error;
pub mod frame;
pub mod id;

pub use codec::{Decoder, Encoder, ENVELOPE_HEADER_SIZE};
pub use context::CallContext;
pub use error::ProtocolError;
pub use frame::{peek_id, CallFrame, ResultFrame, MAX_ERROR_LEN, MAX_OPERATION_LEN};
pub use id::IdGenerator;

/// Boxed error returned by application payload codecs and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default port for muxrpc servers.
pub const DEFAULT_PORT: u16 = 7501;

/// Maximum frame size carried in one envelope (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;
