//! Frame-at-a-time decoding straight from an async stream.
//!
//! [`read_frame`] is the standalone decoder for callers that own a reader
//! and want exactly one frame per call. The client's receive task uses
//! [`FrameBuffer`](super::FrameBuffer) instead. Both apply the same length
//! check (`decode_length`) and body split (`Frame::from_body`), and both
//! hand out every frame ahead of a bad prefix before reporting it.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::wire_format::{decode_length, LENGTH_PREFIX_SIZE};
use super::Frame;
use crate::error::{Result, TransportError};

/// Read exactly one frame from `reader`.
///
/// A zero-byte read or EOF inside a frame is `ConnectionClosed`. The length
/// is validated before the body buffer is allocated.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    read_full(reader, &mut prefix).await?;
    let length = decode_length(prefix)?;

    let mut body = BytesMut::zeroed(length);
    read_full(reader, &mut body).await?;
    Frame::from_body(body.freeze())
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(TransportError::ConnectionClosed)
        }
        Err(e) => Err(TransportError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameBuffer, FrameType};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_scenario_client_data() {
        let mut stream: &[u8] = &[0x00, 0x00, 0x00, 0x06, 0x02, 0x00, 0x00, 0x01, 0x68, 0x69];
        let frame = read_frame(&mut stream).await.unwrap();
        let envelope = frame.envelope().unwrap();

        assert_eq!(frame.frame_type(), FrameType::ClientData);
        assert_eq!(envelope.protocol_id, 1);
        assert_eq!(&envelope.body[..], b"hi");
    }

    #[tokio::test]
    async fn test_scenario_heartbeat() {
        let mut stream: &[u8] = &[0x00, 0x00, 0x00, 0x06, 0x06, 0x00, 0x70, 0x69, 0x6E, 0x67];
        let frame = read_frame(&mut stream).await.unwrap();

        assert!(frame.is_heartbeat());
        assert_eq!(frame.payload(), b"ping");
        assert!(stream.is_empty());
    }

    #[tokio::test]
    async fn test_empty_stream_is_closed() {
        let mut stream: &[u8] = &[];
        let result = read_frame(&mut stream).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_eof_mid_body_is_closed() {
        let mut stream: &[u8] = &[0x00, 0x00, 0x00, 0x06, 0x02, 0x00, 0x00];
        let result = read_frame(&mut stream).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_oversized_length_does_not_read_body() {
        let (mut client, mut server) = tokio::io::duplex(64);
        // The peer never sends a body; decoding must fail on the prefix alone.
        server.write_all(&[0xFF, 0x00, 0x00, 0x00]).await.unwrap();

        let result = read_frame(&mut client).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge(0xFF00_0000))));
    }

    #[tokio::test]
    async fn test_frames_read_back_to_back() {
        let mut bytes = Frame::client_data(10, b"a").to_bytes();
        bytes.extend(Frame::client_data(11, b"").to_bytes());
        let mut stream: &[u8] = &bytes;

        let first = read_frame(&mut stream).await.unwrap().envelope().unwrap();
        let second = read_frame(&mut stream).await.unwrap().envelope().unwrap();

        assert_eq!(first.protocol_id, 10);
        assert_eq!(second.protocol_id, 11);
        assert!(second.body.is_empty());
    }

    #[tokio::test]
    async fn test_agrees_with_frame_buffer_on_bad_prefix() {
        let mut bytes = Frame::client_data(1, b"before").to_bytes();
        bytes.extend([0x00, 0x10, 0x00, 0x01]);

        let mut buffer = FrameBuffer::new();
        buffer.extend(&bytes);
        let mut stream: &[u8] = &bytes;

        let buffered = buffer.next_frame().unwrap().unwrap();
        let streamed = read_frame(&mut stream).await.unwrap();
        assert_eq!(buffered.payload(), streamed.payload());

        assert!(matches!(buffer.next_frame(), Err(TransportError::FrameTooLarge(1_048_577))));
        assert!(matches!(
            read_frame(&mut stream).await,
            Err(TransportError::FrameTooLarge(1_048_577))
        ));
    }
}
