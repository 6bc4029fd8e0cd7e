//! Ping client - connects, registers typed handlers and echoes a counter.
//!
//! This demo shows:
//! - Building a client with the fluent builder
//! - Declaring inbound protocols (raw and MsgPack) in a `ProtocolRegistry`
//! - Driving the client from a fixed-rate update loop
//! - Sending from inside a handler through the `Outbox`
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=gamewire_client=debug cargo run --example ping_client -- 127.0.0.1 1011
//! ```
//!
//! The server is expected to answer protocol 10 (`Ping`) with protocol 11
//! (`Pong`, a MsgPack map `{ "seq": u32 }`).

use std::time::{Duration, Instant};

use bytes::Bytes;
use gamewire_client::{Client, ProtocolRegistry};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const PING: u16 = 10;
const PONG: u16 = 11;
const NOTICE: u16 = 12;

#[derive(Serialize, Deserialize, Debug)]
struct Seq {
    seq: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().map(|p| p.parse()).transpose()?.unwrap_or(1011);

    let registry = ProtocolRegistry::builder()
        .inbound_msgpack::<Seq>(PONG, "Pong")
        .inbound_raw(NOTICE, "Notice")
        .outbound(PING, "Ping")
        .build();

    let mut client = Client::builder()
        .host(host)
        .port(port)
        .registry(registry)
        .build()?;

    let outbox = client.outbox();
    client.register_typed(PONG, move |pong: &Seq| {
        tracing::info!(seq = pong.seq, "pong");
        outbox.send_msgpack(PING, &Seq { seq: pong.seq + 1 })?;
        Ok(())
    });
    client.register_typed(NOTICE, |text: &Bytes| {
        tracing::info!("notice: {}", String::from_utf8_lossy(text));
        Ok(())
    });

    client.on_connected(|| tracing::info!("connected"));
    client.on_disconnected(|| tracing::info!("disconnected"));
    client.on_error(|e| tracing::warn!("transport error: {}", e));

    client.connect();

    let frame = Duration::from_millis(16);
    let mut last = Instant::now();
    let mut started = false;
    let deadline = Instant::now() + Duration::from_secs(60);

    while Instant::now() < deadline {
        let now = Instant::now();
        client.tick(now - last);
        last = now;

        if client.is_connected() && !started {
            started = client.send_msgpack(PING, &Seq { seq: 0 }).is_ok();
        }
        if !client.is_connected() {
            started = false;
        }

        std::thread::sleep(frame);
    }

    tracing::info!(stats = ?client.stats(), "done");
    client.disconnect();
    Ok(())
}
