//! Client configuration.
//!
//! [`ClientConfig`] can be built in code (see [`ClientBuilder`](crate::ClientBuilder))
//! or deserialized from any serde format. Durations are written as fractional
//! seconds:
//!
//! ```
//! use gamewire_client::ClientConfig;
//!
//! let config: ClientConfig = serde_json::from_str(
//!     r#"{ "host": "10.0.0.5", "port": 7000, "heartbeat_interval": 2.5 }"#,
//! ).unwrap();
//! assert_eq!(config.port, 7000);
//! assert_eq!(config.heartbeat_interval.as_millis(), 2500);
//! assert_eq!(config.max_reconnect_attempts, 5);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 1011;

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// Default reconnect attempt ceiling.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default TCP handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time `disconnect` waits for the receive task to exit.
pub const DEFAULT_RECEIVER_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default inbound queue capacity (messages).
pub const DEFAULT_INBOUND_CAPACITY: usize = 4096;

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Interval between heartbeats while connected.
    #[serde(with = "secs_f64")]
    pub heartbeat_interval: Duration,
    /// Interval between automatic reconnect attempts.
    #[serde(with = "secs_f64")]
    pub reconnect_interval: Duration,
    /// Automatic attempts before giving up until the next explicit connect.
    pub max_reconnect_attempts: u32,
    /// Whether the reconnect policy runs at all.
    pub auto_reconnect: bool,
    /// TCP handshake timeout.
    #[serde(with = "secs_f64")]
    pub connect_timeout: Duration,
    /// Bound on waiting for the receive task during teardown.
    #[serde(with = "secs_f64")]
    pub receiver_join_timeout: Duration,
    /// Inbound queue capacity; the receive task waits when it is full.
    pub inbound_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            auto_reconnect: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            receiver_join_timeout: DEFAULT_RECEIVER_JOIN_TIMEOUT,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Check the configuration for misconfigurations.
    ///
    /// A wildcard host is a listen address, not a connect target, and is
    /// reported as `InvalidTarget` rather than left to fail at connect time.
    pub fn validate(&self) -> Result<()> {
        crate::transport::validate_target(&self.host, self.port)?;

        for (name, value) in [
            ("heartbeat_interval", self.heartbeat_interval),
            ("reconnect_interval", self.reconnect_interval),
            ("connect_timeout", self.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(TransportError::Config(format!("{name} must be non-zero")));
            }
        }

        if self.inbound_capacity == 0 {
            return Err(TransportError::Config(
                "inbound_capacity must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Serde helper for `Duration` as fractional seconds.
mod secs_f64 {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 1011);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.reconnect_interval, Duration::from_secs(3));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert!(config.auto_reconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wildcard_host_rejected() {
        for host in ["0.0.0.0", "::", "[::]", ""] {
            let config = ClientConfig {
                host: host.to_string(),
                ..ClientConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(TransportError::InvalidTarget(_))),
                "{host:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ClientConfig {
            heartbeat_interval: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(TransportError::Config(_))));
    }

    #[test]
    fn test_json_roundtrip_uses_seconds() {
        let config = ClientConfig {
            reconnect_interval: Duration::from_millis(1500),
            ..ClientConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["reconnect_interval"], 1.5);

        let back: ClientConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result: std::result::Result<ClientConfig, _> =
            serde_json::from_str(r#"{ "heartbeat_interval": -1.0 }"#);
        assert!(result.is_err());
    }
}
