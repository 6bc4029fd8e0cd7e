//! Incremental frame cutter for the socket read path.
//!
//! TCP delivers arbitrary slices of the stream. [`FrameBuffer`] keeps the
//! unconsumed tail in a `BytesMut` and cuts complete frames out of it as
//! `Bytes` views, alternating between two states:
//! - `WaitingForLength`: fewer than 4 prefix bytes buffered
//! - `WaitingForBody`: prefix checked against the cap, body incomplete
//!
//! # Example
//!
//! ```
//! use gamewire_client::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//! let frames = buffer
//!     .push(&[0, 0, 0, 6, 0x02, 0x00, 0x00, 0x01, b'h', b'i'])
//!     .unwrap();
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].envelope().unwrap().protocol_id, 1);
//! ```

use bytes::BytesMut;

use super::wire_format::{decode_length, LENGTH_PREFIX_SIZE};
use super::Frame;
use crate::error::Result;

/// Default read-side capacity (64 KiB).
const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Position within the current frame.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the length prefix.
    WaitingForLength,
    /// Length parsed, waiting for `remaining` body bytes.
    WaitingForBody { remaining: usize },
}

/// Accumulates stream bytes and yields whole frames in wire order.
///
/// A length outside `1..=MAX_FRAME_BODY` is reported as soon as the prefix
/// is complete, before any of the body is buffered. After an error the
/// stream is unusable and the buffer should be dropped.
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new frame buffer with custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForLength,
        }
    }

    /// Append stream bytes without cutting any frames.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data is kept for the next push. Frames come back in wire order.
    /// An error discards the frames cut earlier in the same call; use
    /// [`extend`](Self::extend) and [`next_frame`](Self::next_frame) when
    /// frames ahead of a bad prefix must still be delivered.
    ///
    /// # Errors
    ///
    /// `FrameEmpty` or `FrameTooLarge` if a length prefix is out of bounds.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.extend(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Cut the next complete frame, if one is buffered.
    ///
    /// Frames before a bad length prefix are returned first; the error
    /// surfaces on the call that reaches the prefix.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::WaitingForLength => {
                    if self.buffer.len() < LENGTH_PREFIX_SIZE {
                        return Ok(None);
                    }

                    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
                    prefix.copy_from_slice(&self.buffer[..LENGTH_PREFIX_SIZE]);
                    let remaining = decode_length(prefix)?;

                    let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);
                    self.state = State::WaitingForBody { remaining };
                }

                State::WaitingForBody { remaining } => {
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }

                    let body = self.buffer.split_to(remaining).freeze();
                    self.state = State::WaitingForLength;
                    return Frame::from_body(body).map(Some);
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::protocol::{encode_frame, flags, FrameType, HEADER_SIZE};

    fn data_frame(protocol_id: u16, body: &[u8]) -> Vec<u8> {
        Frame::client_data(protocol_id, body).to_bytes()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&data_frame(1, b"hello")).unwrap();

        assert_eq!(frames.len(), 1);
        let envelope = frames[0].envelope().unwrap();
        assert_eq!(envelope.protocol_id, 1);
        assert_eq!(&envelope.body[..], b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push_keep_order() {
        let mut buffer = FrameBuffer::new();

        let mut combined = Vec::new();
        combined.extend(data_frame(1, b"first"));
        combined.extend(Frame::heartbeat().to_bytes());
        combined.extend(data_frame(3, b"third"));

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].envelope().unwrap().protocol_id, 1);
        assert!(frames[1].is_heartbeat());
        assert_eq!(frames[2].envelope().unwrap().protocol_id, 3);
    }

    #[test]
    fn test_fragmented_length_prefix() {
        let mut buffer = FrameBuffer::new();
        let bytes = data_frame(1, b"test");

        assert!(buffer.push(&bytes[..3]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForLength");

        let frames = buffer.push(&bytes[3..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_body() {
        let mut buffer = FrameBuffer::new();
        let bytes = data_frame(1, b"this body arrives in two separate reads");

        let split = HEADER_SIZE + 5;
        assert!(buffer.push(&bytes[..split]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForBody");

        let frames = buffer.push(&bytes[split..]).unwrap();
        assert_eq!(
            &frames[0].envelope().unwrap().body[..],
            b"this body arrives in two separate reads"
        );
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let mut all = Vec::new();
        for byte in data_frame(7, b"hi") {
            all.extend(buffer.push(&[byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].envelope().unwrap().protocol_id, 7);
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut buffer = FrameBuffer::new();
        let result = buffer.push(&[0, 0, 0, 0]);
        assert!(matches!(result, Err(TransportError::FrameEmpty)));
    }

    #[test]
    fn test_oversized_length_rejected_before_body() {
        let mut buffer = FrameBuffer::new();
        // Only the prefix is supplied; the error must not wait for the body.
        let result = buffer.push(&[0x00, 0x10, 0x00, 0x01]);
        assert!(matches!(result, Err(TransportError::FrameTooLarge(1_048_577))));
    }

    #[test]
    fn test_length_one_is_malformed() {
        let mut buffer = FrameBuffer::new();
        let result = buffer.push(&[0, 0, 0, 1, 0x02]);
        assert!(matches!(result, Err(TransportError::FrameEmpty)));
    }

    #[test]
    fn test_unknown_type_still_framed() {
        let mut buffer = FrameBuffer::new();
        let bytes = encode_frame(FrameType::Other(0x09), 0x01, b"future");
        let frames = buffer.push(&bytes).unwrap();

        assert_eq!(frames[0].frame_type(), FrameType::Other(0x09));
        assert_eq!(frames[0].flags(), 0x01);
    }

    #[test]
    fn test_frames_ahead_of_bad_prefix_are_cut() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(&data_frame(1, b"before"));
        buffer.extend(&[0x00, 0x10, 0x00, 0x01]);

        let frame = buffer.next_frame().unwrap().unwrap();
        assert_eq!(&frame.envelope().unwrap().body[..], b"before");
        assert!(matches!(
            buffer.next_frame(),
            Err(TransportError::FrameTooLarge(1_048_577))
        ));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let bytes = encode_frame(FrameType::ClientData, flags::NONE, b"abcdef");
        buffer.push(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(buffer.state_name(), "WaitingForBody");

        buffer.clear();

        assert_eq!(buffer.state_name(), "WaitingForLength");
        assert!(buffer.is_empty());
    }
}
