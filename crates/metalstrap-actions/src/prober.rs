//! TCP reachability probe

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// Answers "is this port accepting connections right now"
#[async_trait]
pub trait Prober: Send + Sync {
    /// True if a connection to `address:port` completes within `timeout`
    ///
    /// Never fails: refused connections, timeouts and every other transport
    /// error all read as unreachable. No retries happen in here.
    async fn is_reachable(&self, address: &str, port: u16, timeout: Duration) -> bool;
}

/// [`Prober`] that opens a plain TCP connection
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn is_reachable(&self, address: &str, port: u16, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect((address, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                trace!(address, port, error = %e, "Probe failed");
                false
            }
            Err(_) => {
                trace!(address, port, ?timeout, "Probe timed out");
                false
            }
        }
    }
}
