//! Cooperative timers advanced from `Client::tick`.
//!
//! Neither timer owns a thread. Each accumulates the elapsed time it is
//! given and reports when its interval has been reached.

use std::time::Duration;

/// Fires once per heartbeat interval while the connection is up.
#[derive(Debug, Clone)]
pub struct HeartbeatScheduler {
    interval: Duration,
    elapsed: Duration,
}

impl HeartbeatScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
        }
    }

    /// Add `dt`; returns true when a heartbeat is due.
    ///
    /// At most one heartbeat fires per call, however large `dt` is.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Fixed-interval reconnect attempts with a ceiling.
///
/// The policy is armed by an explicit connect and disarmed by an explicit
/// disconnect or a rejected target. Being disconnected with attempts left
/// is not enough on its own: a client that has never connected, or that
/// the host disconnected on purpose, does not redial.
///
/// Attempts are counted here; the counter resets when a connection is
/// established or the host connects explicitly, never on a
/// policy-triggered attempt.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
    elapsed: Duration,
    armed: bool,
}

impl ReconnectPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
            elapsed: Duration::ZERO,
            armed: false,
        }
    }

    /// Add `dt` spent disconnected; returns true when an attempt is due.
    ///
    /// A due attempt is counted before it is reported.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.armed || self.exhausted() {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
            self.attempts += 1;
            true
        } else {
            false
        }
    }

    /// Clear the attempt counter and the elapsed time.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.elapsed = Duration::ZERO;
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.elapsed = Duration::ZERO;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// True once every allowed attempt has been made.
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
