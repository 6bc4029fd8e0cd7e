//! Error types for gamewire-client.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the stream (zero-byte read or EOF mid-frame).
    #[error("Connection closed")]
    ConnectionClosed,

    /// A frame advertised a length of zero.
    #[error("Frame length is zero")]
    FrameEmpty,

    /// A frame advertised a length above the frame cap.
    #[error("Frame length {0} exceeds maximum {max}", max = crate::protocol::MAX_FRAME_BODY)]
    FrameTooLarge(u32),

    /// A ClientData payload was too short to hold a protocol id.
    #[error("Envelope too short: {0} bytes")]
    EnvelopeTooShort(usize),

    /// No decoder is registered for the protocol id.
    #[error("Unknown protocol ID: {0}")]
    UnknownProtocolId(u16),

    /// Frame type byte is not one this client understands.
    #[error("Unknown frame type: 0x{0:02x}")]
    UnknownFrameType(u8),

    /// A registered body decoder rejected the body.
    #[error("Failed to decode body for protocol {protocol_id}: {reason}")]
    Decode {
        /// Protocol id of the offending frame.
        protocol_id: u16,
        /// Decoder-provided description.
        reason: String,
    },

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Target address is a misconfiguration (empty or wildcard host).
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// TCP handshake did not finish in time.
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Operation requires an established connection.
    #[error("Not connected")]
    NotConnected,

    /// Outbound body does not fit in a single frame.
    #[error("Payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),

    /// Error returned by a message handler.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Background runtime could not be created.
    #[error("Failed to start runtime: {0}")]
    Runtime(std::io::Error),
}

impl TransportError {
    /// Whether this error tears down the connection.
    ///
    /// Stream-level failures are fatal. Errors scoped to a single frame
    /// (short envelope, unknown id, decoder failure) only drop that frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::Io(_)
                | TransportError::ConnectionClosed
                | TransportError::FrameEmpty
                | TransportError::FrameTooLarge(_)
        )
    }
}

/// Result type alias using TransportError.
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TransportError::ConnectionClosed.is_fatal());
        assert!(TransportError::FrameEmpty.is_fatal());
        assert!(TransportError::FrameTooLarge(2_000_000).is_fatal());
        assert!(TransportError::Io(std::io::ErrorKind::BrokenPipe.into()).is_fatal());

        assert!(!TransportError::EnvelopeTooShort(1).is_fatal());
        assert!(!TransportError::UnknownProtocolId(7).is_fatal());
        assert!(!TransportError::UnknownFrameType(0x09).is_fatal());
        assert!(!TransportError::Handler("boom".into()).is_fatal());
    }

    #[test]
    fn test_frame_too_large_message() {
        let msg = TransportError::FrameTooLarge(1_048_577).to_string();
        assert!(msg.contains("1048577"));
        assert!(msg.contains("1048576"));
    }
}
