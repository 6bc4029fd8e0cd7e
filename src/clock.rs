//! Server time estimate.

use std::time::{SystemTime, UNIX_EPOCH};

/// Local wall clock corrected by an offset reported by the server.
///
/// Until [`set_offset`](Self::set_offset) is called the estimate is the
/// local clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerClock {
    offset_ms: i64,
}

impl ServerClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the offset from a server timestamp, in ms since the Unix epoch.
    pub fn sync_to(&mut self, server_time_ms: i64) {
        self.offset_ms = server_time_ms - local_time_ms();
        tracing::debug!(offset_ms = self.offset_ms, "Server clock synchronized");
    }

    /// Set the offset directly.
    pub fn set_offset(&mut self, offset_ms: i64) {
        self.offset_ms = offset_ms;
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Estimated server time in ms since the Unix epoch.
    pub fn server_time_ms(&self) -> i64 {
        local_time_ms() + self.offset_ms
    }
}

fn local_time_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        // Clock set before 1970.
        Err(e) => -(e.duration().as_millis() as i64),
    }
}
