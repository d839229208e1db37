//! Metalstrap bootstrap orchestration
//!
//! Runs the per-host pipelines of `metalstrap-actions` across a whole set of
//! targets:
//!
//! - one discovery token per run, fetched before anything else happens
//! - one `tokio` task per host, each inside a `target{host=...}` span
//! - in cluster mode, the manager bootstraps alone, publishes its join
//!   credential through a one-shot channel, and only then are the workers
//!   started, all at once
//!
//! A host that fails is recorded in the [`RunSummary`] and leaves its
//! siblings alone. Only [`RunError`]s stop the run.
//!
//! # Example
//!
//! ```ignore
//! use metalstrap_workflow::{Orchestrator, RunOptions};
//!
//! let mut orchestrator = Orchestrator::new(services, Arc::new(EtcdDiscovery::default()));
//! orchestrator.add_target(TargetConfig::new("203.0.113.10", "node-1", cloud_config))?;
//!
//! let summary = orchestrator.run(RunOptions { cluster: true }).await?;
//! println!("{summary}");
//! ```

pub mod cluster;
pub mod error;
pub mod orchestrator;
pub mod summary;

pub use cluster::{partition, Partition};
pub use error::{Result, RunError};
pub use orchestrator::{Orchestrator, RunOptions};
pub use summary::{HostOutcome, HostReport, Role, RunSummary};
