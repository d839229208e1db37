//! Provisioning control API trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RescueActivation, ResetMode};

/// Remote control operations offered by the hosting provider
///
/// Every `Err` is a non-success result. Callers decide whether it is worth
/// retrying; the trait itself never retries.
#[async_trait]
pub trait ProvisioningApi: Send + Sync {
    /// Activate the rescue system for the next boot
    ///
    /// Returns the one-time root password of the rescue system.
    async fn activate_rescue(&self, address: &str, os: &str, bits: u8)
        -> Result<RescueActivation>;

    /// Deactivate a (possibly half-activated) rescue system
    async fn deactivate_rescue(&self, address: &str) -> Result<()>;

    /// Reset the server
    async fn hard_reset(&self, address: &str, mode: ResetMode) -> Result<()>;
}
