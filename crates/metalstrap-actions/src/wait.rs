//! Waiting for a host to go down and come back
//!
//! Neither loop has an overall deadline: how long a reboot takes is up to
//! the hardware, and the pipeline is willing to wait.

use std::time::Duration;
use tracing::debug;

use crate::prober::Prober;

/// Probe parameters for the reboot wait loops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSettings {
    /// Port to probe
    pub port: u16,
    /// Pause between probes
    pub interval: Duration,
    /// Bound on a single probe
    pub probe_timeout: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            port: 22,
            interval: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(4),
        }
    }
}

/// Return once `address` stops accepting connections
///
/// Sleeps before every probe. Returns the number of probes made.
pub async fn wait_for_down(prober: &dyn Prober, address: &str, settings: &WaitSettings) -> u32 {
    let mut probes = 0;
    loop {
        tokio::time::sleep(settings.interval).await;
        probes += 1;
        if !prober
            .is_reachable(address, settings.port, settings.probe_timeout)
            .await
        {
            debug!(address, probes, "SSH down");
            return probes;
        }
        debug!(address, probes, "SSH up");
    }
}

/// Return once `address` accepts connections
///
/// Probes immediately, sleeping only between failed probes. Returns the
/// number of probes made.
pub async fn wait_for_up(prober: &dyn Prober, address: &str, settings: &WaitSettings) -> u32 {
    let mut probes = 0;
    loop {
        probes += 1;
        if prober
            .is_reachable(address, settings.port, settings.probe_timeout)
            .await
        {
            debug!(address, probes, "SSH up");
            return probes;
        }
        debug!(address, probes, "SSH down");
        tokio::time::sleep(settings.interval).await;
    }
}
