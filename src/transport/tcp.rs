//! TCP connect with target validation and a handshake timeout.
//!
//! # Example
//!
//! ```ignore
//! use gamewire_client::transport::connect;
//! use std::time::Duration;
//!
//! let stream = connect("127.0.0.1", 1011, Duration::from_secs(5)).await?;
//! let (reader, writer) = stream.into_split();
//! ```

use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{Result, TransportError};

/// Hosts that are listen addresses rather than connect targets.
const WILDCARD_HOSTS: &[&str] = &["0.0.0.0", "::", "[::]"];

/// Reject targets that can only be a misconfiguration.
///
/// An empty host, a wildcard bind address, or port 0 never reaches the
/// network; callers see `InvalidTarget` instead of a connect failure.
pub fn validate_target(host: &str, port: u16) -> Result<()> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(TransportError::InvalidTarget("host is empty".to_string()));
    }
    if WILDCARD_HOSTS.contains(&trimmed) {
        return Err(TransportError::InvalidTarget(format!(
            "{trimmed} is a listen address; connect to 127.0.0.1 or the server's real address"
        )));
    }
    if port == 0 {
        return Err(TransportError::InvalidTarget("port 0 is not connectable".to_string()));
    }
    Ok(())
}

/// Open a TCP connection to `host:port`.
///
/// Name resolution, refusal and timeout all surface as errors here. The
/// returned stream has Nagle's algorithm disabled.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    validate_target(host, port)?;

    let target = host.trim();
    let stream = match tokio::time::timeout(timeout, TcpStream::connect((target, port))).await {
        Ok(result) => result?,
        Err(_) => return Err(TransportError::ConnectTimeout(timeout)),
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("Failed to set TCP_NODELAY: {}", e);
    }

    Ok(stream)
}
