//! Length envelope for byte-stream transports.
//!
//! A stream carries frames back to back, each prefixed with its length:
//!
//! ```text
//! +-----------+---------------------------+
//! | frame_len | call or result frame      |
//! | 4 bytes   | frame_len bytes           |
//! +-----------+---------------------------+
//! ```

use crate::error::ProtocolError;
use crate::MAX_FRAME_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the envelope length prefix in bytes.
pub const ENVELOPE_HEADER_SIZE: usize = 4;

/// Wraps encoded frames into envelopes.
pub struct Encoder;

impl Encoder {
    /// Wraps `frame` in an envelope, using the default size limit.
    pub fn encode_envelope(frame: &[u8]) -> Result<Bytes, ProtocolError> {
        Self::encode_envelope_with_limit(frame, MAX_FRAME_SIZE)
    }

    /// Wraps `frame` in an envelope, rejecting frames above `max`.
    pub fn encode_envelope_with_limit(frame: &[u8], max: u32) -> Result<Bytes, ProtocolError> {
        if frame.len() > max as usize {
            return Err(ProtocolError::FrameTooLarge {
                size: frame.len(),
                max,
            });
        }

        let mut buf = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + frame.len());
        buf.put_u32(frame.len() as u32);
        buf.put_slice(frame);
        Ok(buf.freeze())
    }
}

/// Splits a byte stream back into frames.
pub struct Decoder {
    buffer: BytesMut,
    max_frame_size: u32,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            max_frame_size,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to take the next complete frame from the buffer.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame is buffered,
    /// `Ok(None)` if more data is needed, or `Err` if the declared size
    /// exceeds the limit.
    pub fn decode_envelope(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        if self.buffer.len() < ENVELOPE_HEADER_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]);
        if len > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: len as usize,
                max: self.max_frame_size,
            });
        }

        let total = ENVELOPE_HEADER_SIZE + len as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }

        self.buffer.advance(ENVELOPE_HEADER_SIZE);
        Ok(Some(self.buffer.split_to(len as usize).freeze()))
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CallFrame;

    #[test]
    fn test_envelope_roundtrip() {
        let frame = CallFrame::new(42, "echo", "hello").encode().unwrap();
        let envelope = Encoder::encode_envelope(&frame).unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&envelope);

        let decoded = decoder.decode_envelope().unwrap().unwrap();
        assert_eq!(&decoded[..], &frame[..]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_partial_envelope() {
        let envelope = Encoder::encode_envelope(b"0123456789abc").unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&envelope[..2]);
        assert!(decoder.decode_envelope().unwrap().is_none());

        decoder.extend(&envelope[2..10]);
        assert!(decoder.decode_envelope().unwrap().is_none());

        decoder.extend(&envelope[10..]);
        let decoded = decoder.decode_envelope().unwrap().unwrap();
        assert_eq!(&decoded[..], b"0123456789abc");
    }

    #[test]
    fn test_multiple_envelopes_in_buffer() {
        let mut data = Encoder::encode_envelope(b"first").unwrap().to_vec();
        data.extend_from_slice(&Encoder::encode_envelope(b"second").unwrap());

        let mut decoder = Decoder::new();
        decoder.extend(&data);

        assert_eq!(&decoder.decode_envelope().unwrap().unwrap()[..], b"first");
        assert_eq!(&decoder.decode_envelope().unwrap().unwrap()[..], b"second");
        assert!(decoder.decode_envelope().unwrap().is_none());
    }

    #[test]
    fn test_empty_envelope() {
        let envelope = Encoder::encode_envelope(b"").unwrap();
        assert_eq!(envelope.len(), ENVELOPE_HEADER_SIZE);

        let mut decoder = Decoder::new();
        decoder.extend(&envelope);
        assert!(decoder.decode_envelope().unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_envelope_too_large() {
        let result = Encoder::encode_envelope_with_limit(&[0u8; 33], 32);
        assert!(matches!(
            result,
            Err(ProtocolError::FrameTooLarge { size: 33, max: 32 })
        ));

        let mut decoder = Decoder::with_max_frame_size(32);
        decoder.extend(&64u32.to_be_bytes());
        assert!(matches!(
            decoder.decode_envelope(),
            Err(ProtocolError::FrameTooLarge { size: 64, max: 32 })
        ));
    }

    #[test]
    fn test_decoder_clear() {
        let mut decoder = Decoder::default();
        decoder.extend(b"some data");
        assert_eq!(decoder.buffered(), 9);

        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }
}
