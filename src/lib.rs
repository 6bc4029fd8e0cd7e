//! # gamewire-client
//!
//! Client transport for a length-prefixed binary game protocol over TCP.
//!
//! A [`Client`] keeps one TCP connection to a game server, frames every
//! message, sends heartbeats, reconnects on a fixed interval and hands
//! decoded messages to per-protocol handlers on the host's own thread.
//!
//! ## Wire format
//!
//! ```text
//! Frame    := length:u32 type:u8 flags:u8 payload    length = 2 + len(payload)
//! Envelope := protocol_id:u16 body                   payload of a ClientData frame
//! ```
//!
//! Big-endian throughout. `ClientData = 0x02`, `Heartbeat = 0x06`, frame
//! bodies are capped at 1 MiB.
//!
//! ## Threading
//!
//! The client owns a one-worker tokio runtime for the socket reads and the
//! handshake. Everything else (state transitions, handlers, listeners,
//! timers and sends) happens inside [`Client::tick`] and the other `&mut`
//! methods, on whatever thread the host calls them from.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use gamewire_client::{Client, ProtocolRegistry};
//!
//! # fn main() -> gamewire_client::Result<()> {
//! let mut client = Client::builder()
//!     .host("127.0.0.1")
//!     .port(1011)
//!     .registry(ProtocolRegistry::builder().inbound_raw(2, "Pong").build())
//!     .handler(2, |msg| {
//!         println!("pong on protocol {}", msg.protocol_id());
//!         Ok(())
//!     })
//!     .build()?;
//!
//! client.connect();
//! loop {
//!     client.tick(Duration::from_millis(16));
//!     std::thread::sleep(Duration::from_millis(16));
//! }
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

mod client;
mod clock;
mod connection;
mod receiver;
mod stats;
mod timers;
mod writer;

pub use client::{Client, ClientBuilder, Outbox};
pub use clock::ServerClock;
pub use config::ClientConfig;
pub use connection::ConnectionState;
pub use error::{Result, TransportError};
pub use handler::{DispatchOutcome, Handler, HandlerRegistry, HandlerResult};
pub use protocol::{Message, ProtocolRegistry, RegistryBuilder};
pub use stats::StatsSnapshot;
pub use timers::{HeartbeatScheduler, ReconnectPolicy};
pub use writer::{FrameWriter, OutboundFrame};
