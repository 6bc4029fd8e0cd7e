//! Frame struct with typed accessors.
//!
//! Represents one decoded frame (type, flags, payload) without its length
//! prefix. Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use gamewire_client::protocol::{Frame, FrameType};
//!
//! let frame = Frame::heartbeat();
//! assert_eq!(frame.frame_type(), FrameType::Heartbeat);
//! assert_eq!(frame.payload(), b"ping");
//! ```

use bytes::{Buf, Bytes};

use super::envelope::{decode_envelope, encode_envelope, Envelope};
use super::wire_format::{encode_frame, flags, FrameType, FRAME_META_SIZE};
use crate::error::{Result, TransportError};

/// Payload carried by every heartbeat this client sends.
pub const HEARTBEAT_PAYLOAD: &[u8] = b"ping";

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded type byte.
    pub frame_type: FrameType,
    /// Flags byte (reserved, ignored on receive).
    pub flags: u8,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(frame_type: FrameType, flags: u8, payload: Bytes) -> Self {
        Self {
            frame_type,
            flags,
            payload,
        }
    }

    /// The fixed heartbeat frame.
    pub fn heartbeat() -> Self {
        Self::new(
            FrameType::Heartbeat,
            flags::NONE,
            Bytes::from_static(HEARTBEAT_PAYLOAD),
        )
    }

    /// A ClientData frame wrapping `(protocol_id, body)`.
    pub fn client_data(protocol_id: u16, body: &[u8]) -> Self {
        Self::new(
            FrameType::ClientData,
            flags::NONE,
            Bytes::from(encode_envelope(protocol_id, body)),
        )
    }

    /// Split a frame body (everything after the length prefix).
    ///
    /// The body must hold at least the type and flags bytes.
    pub fn from_body(mut body: Bytes) -> Result<Self> {
        if body.len() < FRAME_META_SIZE {
            return Err(TransportError::FrameEmpty);
        }
        let frame_type = FrameType::from_u8(body.get_u8());
        let flags = body.get_u8();
        Ok(Self::new(frame_type, flags, body))
    }

    /// Get the frame type.
    #[inline]
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Get the flags byte.
    #[inline]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Check if this is a heartbeat.
    #[inline]
    pub fn is_heartbeat(&self) -> bool {
        self.frame_type == FrameType::Heartbeat
    }

    /// Check if this carries application data.
    #[inline]
    pub fn is_client_data(&self) -> bool {
        self.frame_type == FrameType::ClientData
    }

    /// Decode the envelope of a ClientData frame.
    pub fn envelope(&self) -> Result<Envelope> {
        decode_envelope(self.payload.clone())
    }

    /// Encode to wire bytes including the length prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(self.frame_type, self.flags, &self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_wire_bytes() {
        let bytes = Frame::heartbeat().to_bytes();
        assert_eq!(bytes, [0x00, 0x00, 0x00, 0x06, 0x06, 0x00, 0x70, 0x69, 0x6E, 0x67]);
    }

    #[test]
    fn test_client_data_wire_bytes() {
        let bytes = Frame::client_data(1, b"hi").to_bytes();
        assert_eq!(bytes, [0x00, 0x00, 0x00, 0x06, 0x02, 0x00, 0x00, 0x01, 0x68, 0x69]);
    }

    #[test]
    fn test_from_body_splits_meta() {
        let frame = Frame::from_body(Bytes::from_static(&[0x02, 0x7F, 0xAA, 0xBB])).unwrap();

        assert!(frame.is_client_data());
        assert_eq!(frame.flags(), 0x7F);
        assert_eq!(frame.payload(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_from_body_too_short() {
        assert!(matches!(
            Frame::from_body(Bytes::from_static(&[0x02])),
            Err(TransportError::FrameEmpty)
        ));
    }

    #[test]
    fn test_from_body_empty_payload() {
        let frame = Frame::from_body(Bytes::from_static(&[0x06, 0x00])).unwrap();
        assert!(frame.is_heartbeat());
        assert_eq!(frame.payload_len(), 0);
    }

    #[test]
    fn test_envelope_accessor() {
        let frame = Frame::client_data(0xBEEF, b"body");
        let envelope = frame.envelope().unwrap();

        assert_eq!(envelope.protocol_id, 0xBEEF);
        assert_eq!(&envelope.body[..], b"body");
    }
}
