//! Single exclusive writer over the socket's write half.
//!
//! Every outbound byte goes through one [`FrameWriter`], owned by the
//! connection and reached only through `&mut`, so two frames can never
//! interleave on the wire.
//!
//! ```text
//! Client::send ─► Connection::send ─► FrameWriter ─► TCP write half
//! Heartbeat    ─┘
//! ```

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TransportError};
use crate::protocol::{encode_header, Frame, FrameType, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// A frame ready to be written to the socket.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// Pre-encoded header (length + type + flags).
    pub header: [u8; HEADER_SIZE],
    /// Payload bytes.
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Create a new outbound frame, checking the payload fits.
    pub fn new(frame_type: FrameType, flags: u8, payload: Bytes) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TransportError::PayloadTooLarge(payload.len()));
        }
        Ok(Self {
            header: encode_header(frame_type, flags, payload.len()),
            payload,
        })
    }

    /// Total size of this frame on the wire.
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

impl TryFrom<Frame> for OutboundFrame {
    type Error = TransportError;

    fn try_from(frame: Frame) -> Result<Self> {
        OutboundFrame::new(frame.frame_type, frame.flags, frame.payload)
    }
}

/// Writer that owns the write half exclusively.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wrap a write half.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one frame and flush.
    pub async fn write_frame(&mut self, frame: &OutboundFrame) -> Result<()> {
        write_batch(&mut self.inner, std::slice::from_ref(frame)).await
    }

    /// Write several frames back to back and flush once.
    pub async fn write_frames(&mut self, frames: &[OutboundFrame]) -> Result<()> {
        write_batch(&mut self.inner, frames).await
    }

    /// Shut down the write direction.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }

    /// Recover the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Write a batch of frames using scatter/gather I/O (write_vectored).
///
/// Partial writes are resumed from the exact byte offset, so the stream
/// never carries a truncated frame followed by a new one.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundFrame]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(OutboundFrame::size).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        if slices.is_empty() {
            break;
        }

        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build IoSlice array for remaining data after `skip_bytes` were written.
fn build_remaining_slices(batch: &[OutboundFrame], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for frame in batch {
        let header_end = offset + HEADER_SIZE;
        if skip_bytes < header_end {
            let start = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&frame.header[start..]));
        }
        offset = header_end;

        if !frame.payload.is_empty() {
            let payload_end = offset + frame.payload.len();
            if skip_bytes < payload_end {
                let start = skip_bytes.saturating_sub(offset);
                slices.push(IoSlice::new(&frame.payload[start..]));
            }
            offset = payload_end;
        }
    }

    slices
}
