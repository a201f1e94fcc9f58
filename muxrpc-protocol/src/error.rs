//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    #[error("truncated frame: declared {declared} bytes, {available} available")]
    TruncatedFrame { declared: usize, available: usize },

    #[error("operation name must not be empty")]
    EmptyOperationName,

    #[error("operation name too long: {0} bytes (max 255)")]
    OperationNameTooLong(usize),

    #[error("error message too long: {0} bytes (max 65535)")]
    ErrorMessageTooLong(usize),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MalformedFrame("frame shorter than 9 bytes");
        assert!(err.to_string().contains("9 bytes"));

        let err = ProtocolError::TruncatedFrame {
            declared: 12,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains('3'));

        let err = ProtocolError::OperationNameTooLong(256);
        assert!(err.to_string().contains("256"));

        let err = ProtocolError::ErrorMessageTooLong(70000);
        assert!(err.to_string().contains("70000"));

        let err = ProtocolError::FrameTooLarge { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));
    }
}
