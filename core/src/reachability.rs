//! Synchronous "is the API host reachable" check.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::config::ClientConfig;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Checks the configured host with a plain TCP connect.
#[derive(Debug, Clone)]
pub struct Reachability {
    host: String,
    port: u16,
    timeout: Duration,
}

impl Reachability {
    /// `None` if the base URL carries no usable host/port.
    pub fn from_config(config: &ClientConfig) -> Option<Self> {
        let (host, port) = config.host_and_port()?;
        Some(Self {
            host,
            port,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True if any resolved address accepts a connection within the timeout.
    pub fn is_reachable(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(host = %self.host, error = %e, "host did not resolve");
                return false;
            }
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok())
    }
}
