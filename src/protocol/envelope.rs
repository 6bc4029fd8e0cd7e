//! Envelope carried inside a ClientData frame.
//!
//! ```text
//! ┌─────────────┬──────────────┐
//! │ Protocol ID │ Body         │
//! │ 2 bytes     │ opaque bytes │
//! │ uint16 BE   │              │
//! └─────────────┴──────────────┘
//! ```
//!
//! An empty body is a valid message. A payload shorter than the protocol
//! id is malformed.

use bytes::{Buf, Bytes};

use crate::error::{Result, TransportError};

/// Size of the protocol id prefix.
pub const PROTOCOL_ID_SIZE: usize = 2;

/// Decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Registered message kind.
    pub protocol_id: u16,
    /// Protocol-specific serialized body.
    pub body: Bytes,
}

/// Encode `(protocol_id, body)` as a ClientData payload.
///
/// # Example
///
/// ```
/// use gamewire_client::protocol::encode_envelope;
///
/// assert_eq!(encode_envelope(1, b"hi"), [0x00, 0x01, b'h', b'i']);
/// ```
pub fn encode_envelope(protocol_id: u16, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PROTOCOL_ID_SIZE + body.len());
    buf.extend_from_slice(&protocol_id.to_be_bytes());
    buf.extend_from_slice(body);
    buf
}

/// Decode a ClientData payload into an envelope.
pub fn decode_envelope(mut payload: Bytes) -> Result<Envelope> {
    if payload.len() < PROTOCOL_ID_SIZE {
        return Err(TransportError::EnvelopeTooShort(payload.len()));
    }
    let protocol_id = payload.get_u16();
    Ok(Envelope {
        protocol_id,
        body: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_boundary_ids() {
        for id in [0u16, 1, 0x00FF, 0xFF00, u16::MAX] {
            let encoded = encode_envelope(id, b"payload");
            let envelope = decode_envelope(Bytes::from(encoded)).unwrap();
            assert_eq!(envelope.protocol_id, id);
            assert_eq!(&envelope.body[..], b"payload");
        }
    }

    #[test]
    fn test_empty_body_is_valid() {
        let envelope = decode_envelope(Bytes::from_static(&[0x00, 0x2A])).unwrap();
        assert_eq!(envelope.protocol_id, 42);
        assert!(envelope.body.is_empty());
    }

    #[test]
    fn test_short_payload_rejected() {
        assert!(matches!(
            decode_envelope(Bytes::from_static(&[0x01])),
            Err(TransportError::EnvelopeTooShort(1))
        ));
        assert!(matches!(
            decode_envelope(Bytes::new()),
            Err(TransportError::EnvelopeTooShort(0))
        ));
    }

    #[test]
    fn test_largest_body_roundtrip() {
        let body = vec![0x5A; crate::protocol::MAX_PAYLOAD_SIZE - PROTOCOL_ID_SIZE];
        let envelope = decode_envelope(Bytes::from(encode_envelope(9, &body))).unwrap();
        assert_eq!(envelope.protocol_id, 9);
        assert_eq!(envelope.body.len(), body.len());
    }

    #[test]
    fn test_body_is_zero_copy_slice() {
        let payload = Bytes::from(encode_envelope(3, b"shared"));
        let base = payload.as_ptr();
        let envelope = decode_envelope(payload).unwrap();
        assert_eq!(envelope.body.as_ptr(), base.wrapping_add(PROTOCOL_ID_SIZE));
    }
}
