//! Wire format encoding and decoding.
//!
//! Implements the outer frame:
//! ```text
//! ┌──────────┬───────┬───────┬─────────────┐
//! │ Length   │ Type  │ Flags │ Payload     │
//! │ 4 bytes  │ 1 byte│ 1 byte│ Length - 2  │
//! │ uint32 BE│       │       │             │
//! └──────────┴───────┴───────┴─────────────┘
//! ```
//!
//! `Length` counts type + flags + payload, never itself.
//! All multi-byte integers are Big Endian.

use crate::error::{Result, TransportError};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Type byte + flags byte.
pub const FRAME_META_SIZE: usize = 2;

/// Full header size: length prefix + type + flags.
pub const HEADER_SIZE: usize = LENGTH_PREFIX_SIZE + FRAME_META_SIZE;

/// Maximum value of the length field (1 MiB).
pub const MAX_FRAME_BODY: u32 = 1_048_576;

/// Largest payload that fits in one frame.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_BODY as usize - FRAME_META_SIZE;

/// Flag constants for the protocol.
pub mod flags {
    /// No transformation applied to the payload.
    pub const NONE: u8 = 0x00;
}

/// Frame type byte.
///
/// Only two types exist today. Anything else decodes to `Other` so the
/// receive path can log and drop it instead of failing the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Application data carrying an envelope.
    ClientData,
    /// Liveness frame, payload ignored.
    Heartbeat,
    /// Unrecognised type byte.
    Other(u8),
}

impl FrameType {
    /// Wire value of `ClientData`.
    pub const CLIENT_DATA: u8 = 0x02;
    /// Wire value of `Heartbeat`.
    pub const HEARTBEAT: u8 = 0x06;

    /// Decode from the wire byte.
    #[inline]
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            Self::CLIENT_DATA => FrameType::ClientData,
            Self::HEARTBEAT => FrameType::Heartbeat,
            other => FrameType::Other(other),
        }
    }

    /// Encode to the wire byte.
    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            FrameType::ClientData => Self::CLIENT_DATA,
            FrameType::Heartbeat => Self::HEARTBEAT,
            FrameType::Other(b) => b,
        }
    }
}

impl From<u8> for FrameType {
    fn from(byte: u8) -> Self {
        FrameType::from_u8(byte)
    }
}

/// Encode the 6-byte header for a payload of `payload_len` bytes.
///
/// The caller guarantees `payload_len <= MAX_PAYLOAD_SIZE`.
///
/// # Example
///
/// ```
/// use gamewire_client::protocol::{encode_header, flags, FrameType};
///
/// let header = encode_header(FrameType::Heartbeat, flags::NONE, 4);
/// assert_eq!(header, [0, 0, 0, 6, 0x06, 0x00]);
/// ```
pub fn encode_header(frame_type: FrameType, flags: u8, payload_len: usize) -> [u8; HEADER_SIZE] {
    debug_assert!(payload_len <= MAX_PAYLOAD_SIZE);
    let length = (FRAME_META_SIZE + payload_len) as u32;
    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&length.to_be_bytes());
    buf[4] = frame_type.as_u8();
    buf[5] = flags;
    buf
}

/// Encode a complete frame as a single byte vector.
///
/// # Example
///
/// ```
/// use gamewire_client::protocol::{encode_frame, flags, FrameType};
///
/// let bytes = encode_frame(FrameType::Heartbeat, flags::NONE, b"ping");
/// assert_eq!(bytes, [0, 0, 0, 6, 0x06, 0x00, b'p', b'i', b'n', b'g']);
/// ```
pub fn encode_frame(frame_type: FrameType, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&encode_header(frame_type, flags, payload.len()));
    buf.extend_from_slice(payload);
    buf
}

/// Validate a length prefix and return the number of bytes that follow it.
///
/// Bounds are checked before any body bytes are read, so a hostile length
/// never causes a large allocation.
pub fn decode_length(prefix: [u8; LENGTH_PREFIX_SIZE]) -> Result<usize> {
    let length = u32::from_be_bytes(prefix);
    if length == 0 {
        return Err(TransportError::FrameEmpty);
    }
    if length > MAX_FRAME_BODY {
        return Err(TransportError::FrameTooLarge(length));
    }
    Ok(length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_big_endian_byte_order() {
        let header = encode_header(FrameType::ClientData, flags::NONE, 0x000A_0B0C - 2);

        assert_eq!(&header[0..4], &[0x00, 0x0A, 0x0B, 0x0C]);
        assert_eq!(header[4], 0x02);
        assert_eq!(header[5], 0x00);
    }

    #[test]
    fn test_length_excludes_itself() {
        let bytes = encode_frame(FrameType::ClientData, flags::NONE, b"abc");
        assert_eq!(bytes.len(), 4 + 2 + 3);
        assert_eq!(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 5);
    }

    #[test]
    fn test_frame_type_mapping() {
        assert_eq!(FrameType::from_u8(0x02), FrameType::ClientData);
        assert_eq!(FrameType::from_u8(0x06), FrameType::Heartbeat);
        assert_eq!(FrameType::from_u8(0x09), FrameType::Other(0x09));
        assert_eq!(FrameType::Other(0x09).as_u8(), 0x09);
        assert_eq!(FrameType::ClientData.as_u8(), 0x02);
    }

    #[test]
    fn test_decode_length_bounds() {
        assert!(matches!(
            decode_length([0, 0, 0, 0]),
            Err(TransportError::FrameEmpty)
        ));
        assert_eq!(decode_length([0, 0x10, 0, 0]).unwrap(), 1_048_576);
        assert!(matches!(
            decode_length([0, 0x10, 0, 1]),
            Err(TransportError::FrameTooLarge(1_048_577))
        ));
        assert!(matches!(
            decode_length([0xFF, 0xFF, 0xFF, 0xFF]),
            Err(TransportError::FrameTooLarge(u32::MAX))
        ));
        assert_eq!(decode_length([0, 0, 0, 2]).unwrap(), 2);
    }

    #[test]
    fn test_max_payload_fits() {
        let header = encode_header(FrameType::ClientData, flags::NONE, MAX_PAYLOAD_SIZE);
        let prefix = [header[0], header[1], header[2], header[3]];
        assert_eq!(decode_length(prefix).unwrap(), MAX_FRAME_BODY as usize);
    }
}
