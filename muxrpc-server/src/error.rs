//! Server error types.

use muxrpc_protocol::BoxError;
use thiserror::Error;

/// Server errors.
///
/// Errors raised while dispatching a call are reported to the caller as the
/// error message of its result frame.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] muxrpc_protocol::ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] muxrpc_transport::TransportError),

    #[error("operation name must not be empty")]
    EmptyOperationName,

    #[error("handler not found for operation '{0}'")]
    HandlerNotFound(String),

    #[error("failed to decode request: {0}")]
    Decode(#[source] BoxError),

    #[error("failed to encode response: {0}")]
    Encode(#[source] BoxError),

    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl ServerError {
    /// Returns whether the failure happened before a handler was chosen.
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            ServerError::Protocol(_) | ServerError::EmptyOperationName | ServerError::HandlerNotFound(_)
        )
    }
}
