//! Call and result frames.
//!
//! Call frame layout (9 bytes minimum):
//!
//! ```text
//! +---------+----------+----------------+-----------+
//! | id      | name_len | operation name | body      |
//! | 8 bytes | 1 byte   | name_len bytes | remainder |
//! +---------+----------+----------------+-----------+
//! ```
//!
//! Result frame layout (10 bytes minimum):
//!
//! ```text
//! +---------+---------+---------------+-----------+
//! | id      | err_len | error message | body      |
//! | 8 bytes | 2 bytes | err_len bytes | remainder |
//! +---------+---------+---------------+-----------+
//! ```
//!
//! All integers are big-endian. An `err_len` of zero means "no error", so an
//! empty error message and an absent one are indistinguishable on the wire.

use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};

/// Fixed prefix of a call frame: id + name length.
pub const CALL_HEADER_SIZE: usize = 8 + 1;

/// Fixed prefix of a result frame: id + error length.
pub const RESULT_HEADER_SIZE: usize = 8 + 2;

/// Longest operation name a call frame can carry.
pub const MAX_OPERATION_LEN: usize = u8::MAX as usize;

/// Longest error message a result frame can carry.
pub const MAX_ERROR_LEN: usize = u16::MAX as usize;

/// An outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Correlation id, unique among the connection's outstanding calls.
    pub id: u64,
    /// Name of the operation to invoke (1-255 bytes).
    pub operation: String,
    /// Opaque request payload.
    pub body: Bytes,
}

impl CallFrame {
    pub fn new(id: u64, operation: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            operation: operation.into(),
            body: body.into(),
        }
    }

    /// Encodes the frame, rejecting operation names the length byte cannot hold.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let name = self.operation.as_bytes();
        if name.is_empty() {
            return Err(ProtocolError::EmptyOperationName);
        }
        if name.len() > MAX_OPERATION_LEN {
            return Err(ProtocolError::OperationNameTooLong(name.len()));
        }

        let mut buf = BytesMut::with_capacity(CALL_HEADER_SIZE + name.len() + self.body.len());
        buf.put_u64(self.id);
        buf.put_u8(name.len() as u8);
        buf.put_slice(name);
        buf.put_slice(&self.body);
        Ok(buf)
    }

    /// Decodes a complete call frame.
    pub fn decode(data: &Bytes) -> Result<Self, ProtocolError> {
        if data.len() < CALL_HEADER_SIZE {
            return Err(ProtocolError::MalformedFrame("call frame shorter than 9 bytes"));
        }

        let id = read_id(data);
        let name_len = data[8] as usize;
        if name_len == 0 {
            return Err(ProtocolError::MalformedFrame("zero-length operation name"));
        }

        let rest = data.len() - CALL_HEADER_SIZE;
        if rest < name_len {
            return Err(ProtocolError::TruncatedFrame {
                declared: name_len,
                available: rest,
            });
        }

        let name_end = CALL_HEADER_SIZE + name_len;
        let operation = std::str::from_utf8(&data[CALL_HEADER_SIZE..name_end])
            .map_err(|_| ProtocolError::MalformedFrame("operation name is not valid UTF-8"))?
            .to_string();

        Ok(Self {
            id,
            operation,
            body: data.slice(name_end..),
        })
    }
}

/// An inbound response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFrame {
    /// Echo of the originating call's id.
    pub id: u64,
    /// Error message, if the call failed.
    pub error: Option<Bytes>,
    /// Opaque response payload, meaningful only when `error` is `None`.
    pub body: Bytes,
}

impl ResultFrame {
    /// Creates a successful result.
    pub fn ok(id: u64, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            error: None,
            body: body.into(),
        }
    }

    /// Creates a failed result carrying `message`.
    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(Bytes::from(message.into())),
            body: Bytes::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the error message as text, replacing invalid UTF-8.
    pub fn error_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| String::from_utf8_lossy(e).into_owned())
    }

    /// Encodes the frame, rejecting error messages the length field cannot hold.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let error: &[u8] = self.error.as_deref().unwrap_or_default();
        if error.len() > MAX_ERROR_LEN {
            return Err(ProtocolError::ErrorMessageTooLong(error.len()));
        }

        let mut buf = BytesMut::with_capacity(RESULT_HEADER_SIZE + error.len() + self.body.len());
        buf.put_u64(self.id);
        buf.put_u16(error.len() as u16);
        buf.put_slice(error);
        buf.put_slice(&self.body);
        Ok(buf)
    }

    /// Decodes a complete result frame.
    pub fn decode(data: &Bytes) -> Result<Self, ProtocolError> {
        if data.len() < RESULT_HEADER_SIZE {
            return Err(ProtocolError::MalformedFrame(
                "result frame shorter than 10 bytes",
            ));
        }

        let id = read_id(data);
        let err_len = u16::from_be_bytes([data[8], data[9]]) as usize;
        if err_len == 0 {
            return Ok(Self {
                id,
                error: None,
                body: data.slice(RESULT_HEADER_SIZE..),
            });
        }

        let rest = data.len() - RESULT_HEADER_SIZE;
        if rest < err_len {
            return Err(ProtocolError::TruncatedFrame {
                declared: err_len,
                available: rest,
            });
        }

        let err_end = RESULT_HEADER_SIZE + err_len;
        Ok(Self {
            id,
            error: Some(data.slice(RESULT_HEADER_SIZE..err_end)),
            body: data.slice(err_end..),
        })
    }
}

/// Reads the correlation id of a frame that may not decode fully.
///
/// Returns `None` when fewer than 8 bytes are present.
pub fn peek_id(data: &[u8]) -> Option<u64> {
    (data.len() >= 8).then(|| read_id(data))
}

fn read_id(data: &[u8]) -> u64 {
    let mut id = [0u8; 8];
    id.copy_from_slice(&data[..8]);
    u64::from_be_bytes(id)
}
