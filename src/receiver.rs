//! Background receive task.
//!
//! One task per connected period. It reads the socket, cuts frames with a
//! [`FrameBuffer`], drops heartbeats, decodes ClientData through the
//! [`ProtocolRegistry`] and pushes decoded messages onto the bounded inbound
//! queue. It never touches connection state: when the stream ends it posts
//! a [`ConnectionEvent`] and exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::connection::ConnectionEvent;
use crate::error::TransportError;
use crate::protocol::{Frame, FrameBuffer, FrameType, Message, ProtocolRegistry};
use crate::stats::TransportStats;

/// Socket read buffer size.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Why the receive loop stopped.
#[derive(Debug)]
enum Exit {
    /// Stream failed or ended; the connection must be torn down.
    Failed(TransportError),
    /// Stop was requested or the queue consumer went away.
    Stopped,
}

/// Everything the receive task needs besides the socket.
#[derive(Clone)]
pub(crate) struct ReceiverContext {
    pub registry: Arc<ProtocolRegistry>,
    pub inbound: mpsc::Sender<Message>,
    pub events: mpsc::UnboundedSender<ConnectionEvent>,
    pub stats: Arc<TransportStats>,
}

/// Handle to a running receive task.
pub(crate) struct ReceiverHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    /// Spawn the receive task for connection `epoch`.
    pub fn spawn<R>(runtime: &Handle, reader: R, epoch: u64, ctx: ReceiverContext) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let events = ctx.events.clone();

        let task = runtime.spawn(async move {
            let exit = tokio::select! {
                exit = receive_loop(reader, &ctx) => exit,
                _ = shutdown_rx => Exit::Stopped,
            };

            match exit {
                Exit::Failed(error) => {
                    tracing::debug!(epoch, "Receive loop ended: {}", error);
                    let _ = events.send(ConnectionEvent::ReceiverExited { epoch, error });
                }
                Exit::Stopped => tracing::debug!(epoch, "Receive loop stopped"),
            }
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Signal the task and wait up to `timeout` for it to exit.
    ///
    /// Must be called from outside the runtime. On timeout the task is
    /// aborted and `false` is returned; teardown proceeds either way.
    pub fn stop(mut self, runtime: &Handle, timeout: Duration) -> bool {
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.send(());
        }
        let Some(task) = self.task.take() else {
            return true;
        };

        let abort = task.abort_handle();
        match runtime.block_on(tokio::time::timeout(timeout, task)) {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(?timeout, "Receive task did not exit in time, aborting");
                abort.abort();
                false
            }
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Main read loop - reads bytes, cuts frames, queues messages.
async fn receive_loop<R>(mut reader: R, ctx: &ReceiverContext) -> Exit
where
    R: AsyncRead + Unpin,
{
    let mut frame_buffer = FrameBuffer::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Exit::Failed(TransportError::ConnectionClosed),
            Ok(n) => n,
            Err(e) => return Exit::Failed(TransportError::Io(e)),
        };

        frame_buffer.extend(&buf[..n]);

        // Each frame is queued before the next prefix is checked.
        loop {
            let frame = match frame_buffer.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Fatal frame error: {}", e);
                    return Exit::Failed(e);
                }
            };
            ctx.stats.frame_received();
            let Some(message) = process_frame(frame, ctx) else {
                continue;
            };
            // Waits while the queue is full, which stops reading the socket.
            if ctx.inbound.send(message).await.is_err() {
                return Exit::Stopped;
            }
            ctx.stats.message_queued();
        }
    }
}

/// Turn one frame into a queued message, or drop it.
///
/// Every failure here is scoped to the frame; the stream continues.
fn process_frame(frame: Frame, ctx: &ReceiverContext) -> Option<Message> {
    if frame.flags() != 0 {
        tracing::trace!(flags = frame.flags(), "Ignoring reserved flags");
    }

    match frame.frame_type() {
        FrameType::Heartbeat => {
            ctx.stats.heartbeat_received();
            None
        }
        FrameType::ClientData => {
            let decoded = frame.envelope().and_then(|envelope| {
                let protocol_id = envelope.protocol_id;
                let len = envelope.body.len();
                ctx.registry.decode(envelope).map(|msg| (msg, protocol_id, len))
            });
            match decoded {
                Ok((message, protocol_id, len)) => {
                    tracing::debug!(
                        protocol_id,
                        protocol = %ctx.registry.inbound_name(protocol_id),
                        len,
                        "Received message"
                    );
                    Some(message)
                }
                Err(e) => {
                    tracing::warn!("Dropping frame: {}", e);
                    ctx.stats.frame_dropped();
                    None
                }
            }
        }
        FrameType::Other(byte) => {
            tracing::warn!("Dropping frame: {}", TransportError::UnknownFrameType(byte));
            ctx.stats.frame_dropped();
            None
        }
    }
}
