//! Client error types.

use muxrpc_protocol::BoxError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol error: {0}")]
    Protocol(#[from] muxrpc_protocol::ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] muxrpc_transport::TransportError),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("remote error: {0}")]
    Remote(String),

    #[error("failed to encode request: {0}")]
    Encode(#[source] BoxError),

    #[error("failed to decode response: {0}")]
    Decode(#[source] BoxError),

    #[error("request timeout")]
    Timeout,

    #[error("call cancelled")]
    Cancelled,

    #[error("call id {0} is already pending")]
    DuplicateCallId(u64),
}

impl ClientError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Timeout | ClientError::ConnectionClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muxrpc_protocol::ProtocolError;
    use muxrpc_transport::TransportError;

    #[test]
    fn test_retryable() {
        assert!(ClientError::ConnectionClosed.is_retryable());
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Transport(TransportError::NotConnected).is_retryable());

        assert!(!ClientError::Remote("boom".into()).is_retryable());
        assert!(!ClientError::Cancelled.is_retryable());
        assert!(!ClientError::Protocol(ProtocolError::EmptyOperationName).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = ClientError::Remote("handler not found for operation 'nope'".into());
        assert!(err.to_string().contains("nope"));

        let err = ClientError::Encode("bad input".into());
        assert!(err.to_string().contains("bad input"));

        let err = ClientError::DuplicateCallId(7);
        assert!(err.to_string().contains('7'));
    }
}
