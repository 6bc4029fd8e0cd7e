//! Client builder and cooperative tick loop.
//!
//! The [`ClientBuilder`] provides a fluent API over [`ClientConfig`] plus
//! the protocol and handler registries. The [`Client`] owns everything:
//! the background runtime, the connection, the inbound queue, the timers
//! and the listeners. The host drives it by calling [`Client::tick`] from
//! its update loop; handlers and listeners run inside that call.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use bytes::Bytes;
//! use gamewire_client::{Client, ProtocolRegistry};
//!
//! # fn main() -> gamewire_client::Result<()> {
//! let registry = ProtocolRegistry::builder()
//!     .inbound_raw(1001, "ChatLine")
//!     .outbound(1000, "ChatSend")
//!     .build();
//!
//! let mut client = Client::builder()
//!     .host("127.0.0.1")
//!     .port(1011)
//!     .registry(registry)
//!     .build()?;
//!
//! client.register_typed(1001, |line: &Bytes| {
//!     println!("chat: {}", String::from_utf8_lossy(line));
//!     Ok(())
//! });
//! client.on_connected(|| println!("connected"));
//! client.connect();
//!
//! loop {
//!     client.tick(Duration::from_millis(16));
//!     if client.is_connected() {
//!         client.send(1000, b"hello");
//!     }
//!     std::thread::sleep(Duration::from_millis(16));
//! }
//! # }
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::clock::ServerClock;
use crate::codec::MsgPackCodec;
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionEvent, ConnectionState, Transition};
use crate::error::{Result, TransportError};
use crate::handler::{HandlerRegistry, HandlerResult};
use crate::protocol::{encode_envelope, flags, Frame, FrameType, Message, ProtocolRegistry};
use crate::receiver::ReceiverContext;
use crate::stats::{StatsSnapshot, TransportStats};
use crate::timers::{HeartbeatScheduler, ReconnectPolicy};
use crate::transport;
use crate::writer::OutboundFrame;

type Listener = Box<dyn FnMut() + Send>;
type ErrorListener = Box<dyn FnMut(&TransportError) + Send>;

/// Builder for configuring and creating a [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    registry: ProtocolRegistry,
    handlers: HandlerRegistry,
}

impl ClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            registry: ProtocolRegistry::empty(),
            handlers: HandlerRegistry::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Server host. Default: `127.0.0.1`
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Server port. Default: 1011
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Heartbeat interval while connected. Default: 5 seconds
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Interval between automatic reconnect attempts. Default: 3 seconds
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.config.reconnect_interval = interval;
        self
    }

    /// Automatic reconnect attempts before giving up. Default: 5
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Enable or disable the reconnect policy. Default: enabled
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// TCP handshake timeout. Default: 5 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// How long teardown waits for the receive task. Default: 1 second
    pub fn receiver_join_timeout(mut self, timeout: Duration) -> Self {
        self.config.receiver_join_timeout = timeout;
        self
    }

    /// Inbound queue capacity. Default: 4096
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.config.inbound_capacity = capacity;
        self
    }

    /// Protocol registry used to decode inbound bodies.
    pub fn registry(mut self, registry: ProtocolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a message handler up front.
    pub fn handler<F>(mut self, protocol_id: u16, handler: F) -> Self
    where
        F: FnMut(&Message) -> HandlerResult + Send + 'static,
    {
        self.handlers.register(protocol_id, handler);
        self
    }

    /// Validate the configuration and build the client.
    ///
    /// Starts the background runtime but does not connect.
    pub fn build(self) -> Result<Client> {
        self.config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("gamewire-io")
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;

        let registry = Arc::new(self.registry);
        let stats = Arc::new(TransportStats::default());
        let (inbound, inbound_rx) = mpsc::channel(self.config.inbound_capacity);
        let (events, events_rx) = mpsc::unbounded_channel();
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

        let ctx = ReceiverContext {
            registry: registry.clone(),
            inbound,
            events,
            stats: stats.clone(),
        };
        let connection = Connection::new(
            runtime.handle().clone(),
            ctx,
            self.config.connect_timeout,
            self.config.receiver_join_timeout,
        );

        Ok(Client {
            heartbeat: HeartbeatScheduler::new(self.config.heartbeat_interval),
            reconnect: ReconnectPolicy::new(
                self.config.reconnect_interval,
                self.config.max_reconnect_attempts,
            ),
            config: self.config,
            connection,
            events_rx,
            inbound_rx,
            outbox_tx,
            outbox_rx,
            registry,
            handlers: self.handlers,
            listeners: Listeners::default(),
            clock: ServerClock::new(),
            stats,
            _runtime: runtime,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Listeners {
    connected: Vec<Listener>,
    disconnected: Vec<Listener>,
    error: Vec<ErrorListener>,
}

impl Listeners {
    fn connected(&mut self) {
        for listener in &mut self.connected {
            listener();
        }
    }

    fn disconnected(&mut self) {
        for listener in &mut self.disconnected {
            listener();
        }
    }

    fn error(&mut self, error: &TransportError) {
        for listener in &mut self.error {
            listener(error);
        }
    }
}

/// Queued outbound message from an [`Outbox`].
struct Queued {
    protocol_id: u16,
    body: Bytes,
}

/// Cloneable handle for queueing sends from inside handlers and listeners.
///
/// Queued messages are written in queue order during the next
/// [`Client::tick`], after inbound dispatch. Messages queued while the
/// client is not connected are dropped when flushed.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Queued>,
}

impl Outbox {
    /// Queue a raw body. Returns false if the client is gone.
    pub fn send(&self, protocol_id: u16, body: impl Into<Bytes>) -> bool {
        self.tx
            .send(Queued {
                protocol_id,
                body: body.into(),
            })
            .is_ok()
    }

    /// Queue a MsgPack-encoded body.
    pub fn send_msgpack<T: Serialize>(&self, protocol_id: u16, value: &T) -> Result<bool> {
        let body = MsgPackCodec::encode(value)?;
        Ok(self.send(protocol_id, body))
    }
}

/// A game-server client driven by the host's update loop.
///
/// Must not be used from inside an async runtime: `tick`, `send` and
/// `disconnect` block on the client's own runtime.
pub struct Client {
    config: ClientConfig,
    connection: Connection,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    inbound_rx: mpsc::Receiver<Message>,
    outbox_tx: mpsc::UnboundedSender<Queued>,
    outbox_rx: mpsc::UnboundedReceiver<Queued>,
    registry: Arc<ProtocolRegistry>,
    handlers: HandlerRegistry,
    heartbeat: HeartbeatScheduler,
    reconnect: ReconnectPolicy,
    listeners: Listeners,
    clock: ServerClock,
    stats: Arc<TransportStats>,
    // Dropped last, after the connection has released its tasks.
    _runtime: Runtime,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build a client from a configuration with an empty protocol registry.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new().config(config).build()
    }

    /// Connect to the configured target.
    ///
    /// See [`connect_to`](Self::connect_to).
    pub fn connect(&mut self) -> bool {
        let host = self.config.host.clone();
        let port = self.config.port;
        self.connect_to(&host, port)
    }

    /// Start connecting to `host:port` in the background.
    ///
    /// Returns true if a handshake was started, or one is already in
    /// progress, or the client is already connected. The outcome arrives
    /// through the listeners during a later [`tick`](Self::tick).
    ///
    /// An explicit connect re-arms the reconnect policy and clears its
    /// attempt counter. A wildcard or empty host, or port 0, is reported
    /// through `on_error` and returns false.
    pub fn connect_to(&mut self, host: &str, port: u16) -> bool {
        if self.connection.state() != ConnectionState::Disconnected {
            return true;
        }

        self.reconnect.reset();
        if let Err(e) = transport::validate_target(host, port) {
            tracing::error!(host, port, "Refusing to connect: {}", e);
            self.reconnect.disarm();
            self.listeners.error(&e);
            return false;
        }

        // Only a connectable target replaces the configured one.
        self.config.host = host.to_string();
        self.config.port = port;

        match self.connection.begin_connect(host, port, false) {
            Ok(_) => {
                self.reconnect.arm();
                true
            }
            Err(e) => {
                tracing::error!(host, port, "Connect failed to start: {}", e);
                self.reconnect.disarm();
                self.listeners.error(&e);
                false
            }
        }
    }

    /// Close the connection.
    ///
    /// Stops the receive task, closes the socket, then fires
    /// `on_disconnected` if a connection was established. The reconnect
    /// policy stays idle until the next explicit connect.
    pub fn disconnect(&mut self) {
        self.reconnect.disarm();
        if self.connection.disconnect() {
            self.heartbeat.reset();
            self.listeners.disconnected();
        }
    }

    /// Send a message body under `protocol_id`.
    ///
    /// Returns false if not connected or if the write failed (in which case
    /// the connection has been torn down).
    pub fn send(&mut self, protocol_id: u16, body: &[u8]) -> bool {
        self.try_send(protocol_id, body).is_ok()
    }

    /// Like [`send`](Self::send), with the failure reason.
    pub fn try_send(&mut self, protocol_id: u16, body: &[u8]) -> Result<()> {
        if !self.is_connected() {
            tracing::warn!(protocol_id, "Send while not connected");
            return Err(TransportError::NotConnected);
        }

        let payload = Bytes::from(encode_envelope(protocol_id, body));
        let frame = OutboundFrame::new(FrameType::ClientData, flags::NONE, payload)?;

        tracing::debug!(
            protocol_id,
            protocol = %self.registry.outbound_name(protocol_id),
            len = body.len(),
            "Sending message"
        );
        self.write(&frame)
    }

    /// Serialize `value` with MsgPack and send it.
    pub fn send_msgpack<T: Serialize>(&mut self, protocol_id: u16, value: &T) -> Result<()> {
        let body = MsgPackCodec::encode(value)?;
        self.try_send(protocol_id, &body)
    }

    /// A handle for queueing sends where `&mut Client` is not available.
    pub fn outbox(&self) -> Outbox {
        Outbox {
            tx: self.outbox_tx.clone(),
        }
    }

    /// Register a handler, replacing any previous one for `protocol_id`.
    pub fn register_handler<F>(&mut self, protocol_id: u16, handler: F)
    where
        F: FnMut(&Message) -> HandlerResult + Send + 'static,
    {
        self.handlers.register(protocol_id, handler);
    }

    /// Register a handler for messages decoded as `T`.
    pub fn register_typed<T, F>(&mut self, protocol_id: u16, handler: F)
    where
        T: Any,
        F: FnMut(&T) -> HandlerResult + Send + 'static,
    {
        self.handlers.register_typed(protocol_id, handler);
    }

    /// Remove the handler for `protocol_id`. Returns whether one existed.
    pub fn unregister_handler(&mut self, protocol_id: u16) -> bool {
        self.handlers.unregister(protocol_id)
    }

    /// Called after each successful handshake.
    pub fn on_connected<F: FnMut() + Send + 'static>(&mut self, listener: F) {
        self.listeners.connected.push(Box::new(listener));
    }

    /// Called after an established connection is closed, for any reason.
    pub fn on_disconnected<F: FnMut() + Send + 'static>(&mut self, listener: F) {
        self.listeners.disconnected.push(Box::new(listener));
    }

    /// Called on connect failures and lost connections.
    pub fn on_error<F: FnMut(&TransportError) + Send + 'static>(&mut self, listener: F) {
        self.listeners.error.push(Box::new(listener));
    }

    /// Advance the client by `dt` of host time.
    ///
    /// In order: apply background events, drain the inbound queue into the
    /// handlers, flush the outbox, then run the heartbeat or reconnect
    /// timer.
    pub fn tick(&mut self, dt: Duration) {
        self.process_events();
        self.dispatch_inbound();
        self.flush_outbox();

        match self.connection.state() {
            ConnectionState::Connected => {
                if self.heartbeat.advance(dt) {
                    self.send_heartbeat();
                }
            }
            ConnectionState::Disconnected if self.config.auto_reconnect => {
                if self.reconnect.advance(dt) {
                    self.attempt_reconnect();
                }
            }
            _ => {}
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.state() == ConnectionState::Connected
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Automatic attempts made since the last reset.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn clock(&self) -> &ServerClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut ServerClock {
        &mut self.clock
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match self.connection.handle_event(event) {
                Some(Transition::Connected) => {
                    self.reconnect.reset();
                    self.heartbeat.reset();
                    self.listeners.connected();
                }
                Some(Transition::ConnectFailed(e)) => {
                    if self.reconnect.is_armed() && self.reconnect.exhausted() {
                        tracing::warn!(
                            attempts = self.reconnect.attempts(),
                            "Reconnect attempts exhausted"
                        );
                    }
                    self.listeners.error(&e);
                }
                Some(Transition::Lost(e)) => self.connection_lost(&e),
                None => {}
            }
        }
    }

    fn dispatch_inbound(&mut self) {
        // Bounded so a flooding peer cannot pin the tick.
        for _ in 0..self.config.inbound_capacity {
            let Ok(message) = self.inbound_rx.try_recv() else {
                break;
            };
            self.stats.message_dispatched();
            self.handlers.dispatch(&message);
        }
    }

    fn flush_outbox(&mut self) {
        while let Ok(queued) = self.outbox_rx.try_recv() {
            if let Err(e) = self.try_send(queued.protocol_id, &queued.body) {
                tracing::warn!(protocol_id = queued.protocol_id, "Queued send dropped: {}", e);
            }
        }
    }

    fn send_heartbeat(&mut self) {
        let frame = match OutboundFrame::try_from(Frame::heartbeat()) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Heartbeat frame: {}", e);
                return;
            }
        };
        if self.write(&frame).is_ok() {
            self.stats.heartbeat_sent();
            tracing::trace!("Heartbeat sent");
        }
    }

    fn attempt_reconnect(&mut self) {
        tracing::info!(
            attempt = self.reconnect.attempts(),
            max = self.reconnect.max_attempts(),
            "Reconnecting"
        );
        let host = self.config.host.clone();
        if let Err(e) = self.connection.begin_connect(&host, self.config.port, true) {
            tracing::error!("Reconnect rejected: {}", e);
            self.listeners.error(&e);
        }
    }

    /// Write through the connection, reporting a lost connection.
    fn write(&mut self, frame: &OutboundFrame) -> Result<()> {
        match self.connection.send(frame) {
            Ok(()) => Ok(()),
            Err(TransportError::NotConnected) => Err(TransportError::NotConnected),
            Err(e) => {
                self.connection_lost(&e);
                Err(e)
            }
        }
    }

    fn connection_lost(&mut self, error: &TransportError) {
        self.heartbeat.reset();
        self.listeners.error(error);
        self.listeners.disconnected();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builder_configuration() {
        let builder = Client::builder()
            .host("10.1.2.3")
            .port(7000)
            .heartbeat_interval(Duration::from_secs(2))
            .reconnect_interval(Duration::from_millis(500))
            .max_reconnect_attempts(9)
            .auto_reconnect(false)
            .inbound_capacity(32);

        assert_eq!(builder.config.host, "10.1.2.3");
        assert_eq!(builder.config.port, 7000);
        assert_eq!(builder.config.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(builder.config.reconnect_interval, Duration::from_millis(500));
        assert_eq!(builder.config.max_reconnect_attempts, 9);
        assert!(!builder.config.auto_reconnect);
        assert_eq!(builder.config.inbound_capacity, 32);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = Client::builder().host("0.0.0.0").build();
        assert!(matches!(result, Err(TransportError::InvalidTarget(_))));

        let result = Client::builder().heartbeat_interval(Duration::ZERO).build();
        assert!(matches!(result, Err(TransportError::Config(_))));
    }

    #[test]
    fn test_starts_disconnected() {
        let client = Client::builder().build().unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
        assert_eq!(client.stats(), StatsSnapshot::default());
    }

    #[test]
    fn test_send_while_disconnected() {
        let mut client = Client::builder().build().unwrap();
        assert!(!client.send(1, b"hi"));
        assert!(matches!(
            client.try_send(1, b"hi"),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn test_invalid_target_reports_error() {
        let mut client = Client::builder().build().unwrap();
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = errors.clone();
        client.on_error(move |e| {
            assert!(matches!(e, TransportError::InvalidTarget(_)));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!client.connect_to("::", 1011));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        // Policy is idle: ticking never starts a handshake.
        client.tick(Duration::from_secs(60));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_rejected_target_leaves_config_untouched() {
        let mut client = Client::builder().host("10.0.0.5").port(7000).build().unwrap();

        assert!(!client.connect_to("0.0.0.0", 1011));
        assert!(!client.connect_to("10.0.0.6", 0));

        assert_eq!(client.config().host, "10.0.0.5");
        assert_eq!(client.config().port, 7000);
        assert!(client.config().validate().is_ok());
    }

    #[test]
    fn test_idle_client_does_not_reconnect() {
        let mut client = Client::builder()
            .reconnect_interval(Duration::from_millis(10))
            .build()
            .unwrap();
        client.tick(Duration::from_secs(1));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[test]
    fn test_handler_registration() {
        let mut client = Client::builder()
            .handler(5, |_msg: &Message| Ok(()))
            .build()
            .unwrap();
        client.register_typed(6, |_v: &Bytes| Ok(()));
        assert!(client.unregister_handler(5));
        assert!(client.unregister_handler(6));
        assert!(!client.unregister_handler(6));
    }

    #[test]
    fn test_outbox_dropped_while_disconnected() {
        let mut client = Client::builder().build().unwrap();
        let outbox = client.outbox();
        assert!(outbox.send(1, &b"queued"[..]));
        client.tick(Duration::from_millis(16));
        assert_eq!(client.stats().frames_sent, 0);
    }
}
