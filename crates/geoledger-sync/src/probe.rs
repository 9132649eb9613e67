//! # Connectivity Probe
//!
//! Decides whether this cycle should try the network at all: one raw TCP
//! dial to a well-known address with a short timeout.
//!
//! The probe never fails. Refused, unroutable, DNS failure and timeout all
//! read as "not reachable".

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Answers "is the outside world reachable right now?".
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// TCP-dial probe.
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    address: String,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    /// Creates a probe for `host:port` (default target is `8.8.8.8:53`).
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        TcpConnectivityProbe {
            address: address.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.address.as_str())).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(address = %self.address, error = %e, "Probe connection failed");
                false
            }
            Err(_) => {
                debug!(address = %self.address, timeout = ?self.timeout, "Probe timed out");
                false
            }
        }
    }
}
