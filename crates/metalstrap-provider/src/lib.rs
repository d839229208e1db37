//! Metalstrap provisioning provider
//!
//! This crate holds the two external services a bootstrap run talks to
//! before it ever opens a shell on a host:
//!
//! - **Provisioning control API**: activates/deactivates the rescue system
//!   and hardware-resets a server ([`ProvisioningApi`], implemented for the
//!   Hetzner Robot webservice by [`RobotClient`]).
//! - **Discovery token source**: hands out the shared cluster discovery
//!   token once per run ([`DiscoveryTokenSource`], implemented for the etcd
//!   public discovery service by [`EtcdDiscovery`]).
//!
//! # Example
//!
//! ```no_run
//! use metalstrap_provider::{ProvisioningApi, ResetMode, RobotClient, RobotConfig};
//!
//! # async fn example() -> metalstrap_provider::Result<()> {
//! let robot = RobotClient::new(RobotConfig::new("#ws+user", "secret"))?;
//!
//! let rescue = robot.activate_rescue("203.0.113.10", "linux", 64).await?;
//! println!("rescue password: {}", rescue.password);
//!
//! robot.hard_reset("203.0.113.10", ResetMode::Hardware).await?;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod discovery;
pub mod error;
pub mod robot;
pub mod types;

#[cfg(test)]
mod test_server;

pub use controller::ProvisioningApi;
pub use discovery::{DiscoveryTokenSource, EtcdDiscovery, DEFAULT_DISCOVERY_URL};
pub use error::{ProviderError, Result};
pub use robot::RobotClient;
pub use types::{RescueActivation, ResetMode, RobotConfig};
