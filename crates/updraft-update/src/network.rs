//! Network reachability probing

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use updraft_core::types::NetworkConfig;
use url::Url;

/// Decides whether a network path to a host exists
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Whether `target` looks reachable right now
    async fn is_online(&self, target: &Url) -> bool;
}

/// Probe that opens a TCP connection to the target's host and port
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl NetworkProbe for TcpProbe {
    async fn is_online(&self, target: &Url) -> bool {
        let (Some(host), Some(port)) = (target.host_str(), target.port_or_known_default()) else {
            debug!("Cannot probe {}: no host or port", target);
            return false;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');

        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Probe to {}:{} failed: {}", host, port, e);
                false
            }
            Err(_) => {
                debug!("Probe to {}:{} timed out", host, port);
                false
            }
        }
    }
}

/// Probe that always reports a network path
pub struct AlwaysOnline;

#[async_trait]
impl NetworkProbe for AlwaysOnline {
    async fn is_online(&self, _target: &Url) -> bool {
        true
    }
}
