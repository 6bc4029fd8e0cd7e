//! Pass-through body codec.
//!
//! Raw bodies reach handlers as the exact `Bytes` slice cut from the read
//! buffer; nothing is copied on the way in.

use bytes::Bytes;

/// Codec for bodies the transport leaves uninterpreted.
pub struct RawCodec;

impl RawCodec {
    /// Outbound body from a borrowed slice.
    #[inline]
    pub fn encode(body: &[u8]) -> Bytes {
        Bytes::copy_from_slice(body)
    }

    /// Inbound body, unchanged.
    #[inline]
    pub fn decode(body: Bytes) -> Bytes {
        body
    }

    /// Inbound body as UTF-8 text (chat lines, notices).
    pub fn decode_text(body: Bytes) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_buffer() {
        let wire = Bytes::from_static(b"\x00\x01hi");
        let body = wire.slice(2..);
        let decoded = RawCodec::decode(body.clone());
        assert_eq!(decoded.as_ptr(), body.as_ptr());
        assert_eq!(&decoded[..], b"hi");
    }

    #[test]
    fn test_encode_copies_binary() {
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(&RawCodec::encode(&all)[..], &all[..]);
    }

    #[test]
    fn test_decode_text() {
        let text = RawCodec::decode_text(Bytes::from("server restarts in 5 min")).unwrap();
        assert_eq!(text, "server restarts in 5 min");
        assert!(RawCodec::decode_text(Bytes::from_static(&[0xff, 0xfe])).is_err());
    }
}
