//! Connection state machine.
//!
//! [`Connection`] is owned by the client and mutated only from the
//! cooperative thread. Background work (the TCP handshake and the receive
//! task) reports through [`ConnectionEvent`]s tagged with the epoch of the
//! attempt that produced them; events from an older epoch are ignored.

use std::fmt;
use std::time::Duration;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Result, TransportError};
use crate::receiver::{ReceiverContext, ReceiverHandle};
use crate::transport;
use crate::writer::{FrameWriter, OutboundFrame};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket. Re-enterable through `connect`.
    Disconnected,
    /// Handshake started by an explicit connect.
    Connecting,
    /// Socket up, receive task running.
    Connected,
    /// Handshake started by the reconnect policy.
    Reconnecting,
}

impl ConnectionState {
    /// True for both handshake states.
    pub fn is_connecting(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Posted by background tasks, drained by the cooperative thread.
#[derive(Debug)]
pub(crate) enum ConnectionEvent {
    Connected { epoch: u64, stream: TcpStream },
    ConnectFailed { epoch: u64, error: TransportError },
    ReceiverExited { epoch: u64, error: TransportError },
}

/// Effect of an applied event.
#[derive(Debug)]
pub(crate) enum Transition {
    /// Handshake completed; now `Connected`.
    Connected,
    /// Handshake failed; now `Disconnected`.
    ConnectFailed(TransportError),
    /// An established connection was lost; now `Disconnected`.
    Lost(TransportError),
}

pub(crate) struct Connection {
    state: ConnectionState,
    epoch: u64,
    runtime: Handle,
    writer: Option<FrameWriter<OwnedWriteHalf>>,
    receiver: Option<ReceiverHandle>,
    connect_task: Option<JoinHandle<()>>,
    ctx: ReceiverContext,
    connect_timeout: Duration,
    join_timeout: Duration,
}

impl Connection {
    pub fn new(
        runtime: Handle,
        ctx: ReceiverContext,
        connect_timeout: Duration,
        join_timeout: Duration,
    ) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            epoch: 0,
            runtime,
            writer: None,
            receiver: None,
            connect_task: None,
            ctx,
            connect_timeout,
            join_timeout,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Start a handshake in the background.
    ///
    /// Returns `Ok(false)` when already connecting or connected. An invalid
    /// target is rejected before any task is spawned.
    pub fn begin_connect(&mut self, host: &str, port: u16, reconnecting: bool) -> Result<bool> {
        if self.state != ConnectionState::Disconnected {
            return Ok(false);
        }
        transport::validate_target(host, port)?;

        self.epoch += 1;
        let epoch = self.epoch;
        let events = self.ctx.events.clone();
        let target = host.to_string();
        let timeout = self.connect_timeout;

        tracing::info!(host = %target, port, epoch, reconnecting, "Connecting");

        self.connect_task = Some(self.runtime.spawn(async move {
            let event = match transport::connect(&target, port, timeout).await {
                Ok(stream) => ConnectionEvent::Connected { epoch, stream },
                Err(error) => ConnectionEvent::ConnectFailed { epoch, error },
            };
            let _ = events.send(event);
        }));

        self.state = if reconnecting {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        };
        Ok(true)
    }

    /// Apply a background event. Stale events yield `None`.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<Transition> {
        match event {
            ConnectionEvent::Connected { epoch, stream } => {
                if epoch != self.epoch || !self.state.is_connecting() {
                    tracing::debug!(epoch, "Discarding stale handshake");
                    return None;
                }
                self.connect_task = None;

                let peer = stream.peer_addr().ok();
                let (read_half, write_half) = stream.into_split();
                self.receiver = Some(ReceiverHandle::spawn(
                    &self.runtime,
                    read_half,
                    epoch,
                    self.ctx.clone(),
                ));
                self.writer = Some(FrameWriter::new(write_half));
                self.state = ConnectionState::Connected;
                self.ctx.stats.connected();

                tracing::info!(?peer, epoch, "Connected");
                Some(Transition::Connected)
            }
            ConnectionEvent::ConnectFailed { epoch, error } => {
                if epoch != self.epoch || !self.state.is_connecting() {
                    return None;
                }
                self.connect_task = None;
                self.state = ConnectionState::Disconnected;

                tracing::warn!(epoch, "Connect failed: {}", error);
                Some(Transition::ConnectFailed(error))
            }
            ConnectionEvent::ReceiverExited { epoch, error } => {
                if epoch != self.epoch || self.state != ConnectionState::Connected {
                    return None;
                }
                tracing::info!(epoch, "Connection lost: {}", error);
                self.teardown();
                Some(Transition::Lost(error))
            }
        }
    }

    /// Explicit disconnect.
    ///
    /// Returns true when an established connection was closed. A pending
    /// handshake is abandoned silently.
    pub fn disconnect(&mut self) -> bool {
        match self.state {
            ConnectionState::Connected => {
                tracing::info!(epoch = self.epoch, "Disconnecting");
                self.teardown();
                true
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                if let Some(task) = self.connect_task.take() {
                    task.abort();
                }
                self.epoch += 1;
                self.state = ConnectionState::Disconnected;
                tracing::debug!("Handshake abandoned");
                false
            }
            ConnectionState::Disconnected => false,
        }
    }

    /// Write one frame synchronously.
    ///
    /// A write failure tears the connection down before the error is
    /// returned.
    pub fn send(&mut self, frame: &OutboundFrame) -> Result<()> {
        let result = match self.writer.as_mut() {
            Some(writer) if self.state == ConnectionState::Connected => {
                self.runtime.block_on(writer.write_frame(frame))
            }
            _ => return Err(TransportError::NotConnected),
        };

        match result {
            Ok(()) => {
                self.ctx.stats.frame_sent();
                Ok(())
            }
            Err(e) => {
                tracing::error!(epoch = self.epoch, "Write failed: {}", e);
                self.teardown();
                Err(e)
            }
        }
    }

    /// Stop the receive task, then close the socket.
    fn teardown(&mut self) {
        // Anything the old receive task already posted is now stale.
        self.epoch += 1;

        if let Some(receiver) = self.receiver.take() {
            receiver.stop(&self.runtime, self.join_timeout);
        }
        if let Some(mut writer) = self.writer.take() {
            let shutdown = tokio::time::timeout(self.join_timeout, writer.shutdown());
            if let Ok(Err(e)) = self.runtime.block_on(shutdown) {
                tracing::debug!("Socket shutdown: {}", e);
            }
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
    }
}
