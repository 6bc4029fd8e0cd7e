//! Transport counters shared between the receive task and the client.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters, updated from both execution contexts.
#[derive(Debug, Default)]
pub struct TransportStats {
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    heartbeats_received: AtomicU64,
    messages_queued: AtomicU64,
    messages_dispatched: AtomicU64,
    frames_sent: AtomicU64,
    heartbeats_sent: AtomicU64,
    connects: AtomicU64,
}

/// Point-in-time copy of [`TransportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames decoded off the wire, any type.
    pub frames_received: u64,
    /// Frames discarded (unknown type, short envelope, unknown id, bad body).
    pub frames_dropped: u64,
    /// Heartbeats received from the server.
    pub heartbeats_received: u64,
    /// Messages pushed onto the inbound queue.
    pub messages_queued: u64,
    /// Messages handed to the dispatcher.
    pub messages_dispatched: u64,
    /// Frames written, heartbeats included.
    pub frames_sent: u64,
    /// Heartbeats written.
    pub heartbeats_sent: u64,
    /// Successful TCP handshakes.
    pub connects: u64,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        #[inline]
        pub(crate) fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl TransportStats {
    counter!(frame_received, frames_received);
    counter!(frame_dropped, frames_dropped);
    counter!(heartbeat_received, heartbeats_received);
    counter!(message_queued, messages_queued);
    counter!(message_dispatched, messages_dispatched);
    counter!(frame_sent, frames_sent);
    counter!(heartbeat_sent, heartbeats_sent);
    counter!(connected, connects);

    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            heartbeats_received: self.heartbeats_received.load(Ordering::Relaxed),
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }
}
