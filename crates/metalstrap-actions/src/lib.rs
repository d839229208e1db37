//! Metalstrap per-host provisioning pipeline
//!
//! Everything that happens to one host during a bootstrap run: the closed
//! set of steps, the handlers behind them, the retry policy for flaky
//! provider calls, the reachability wait loops and the engine that runs a
//! host's steps in order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                ActionEngine                  │
//! │  ┌──────────────────────────────────────┐   │
//! │  │  ActionKind -> Action registry       │   │
//! │  │  enable_rescue_mode | reset | ...    │   │
//! │  └──────────────────────────────────────┘   │
//! │                   │                          │
//! │                   ▼                          │
//! │  ┌──────────────────────────────────────┐   │
//! │  │  run_pipeline(TargetContext)          │   │
//! │  │  - steps strictly in order            │   │
//! │  │  - START / FINISHED timing events     │   │
//! │  │  - stop at the first error            │   │
//! │  └──────────────────────────────────────┘   │
//! └─────────────────────────────────────────────┘
//!          │            │             │
//!          ▼            ▼             ▼
//!   ProvisioningApi  RemoteExecutor  Prober
//!   (RetryPolicy)    KnownHosts      (wait loops)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use metalstrap_actions::{ActionEngine, Target, TargetConfig, TargetContext};
//!
//! let engine = ActionEngine::with_builtin_actions();
//! let target = Target::with_default_actions(TargetConfig::new(ip, hostname, cloud_config));
//! let mut ctx = TargetContext::new(target, services, settings, discovery_token);
//! let report = engine.run_pipeline(&mut ctx).await?;
//! ```

pub mod actions;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod join;
pub mod kind;
pub mod outcome;
pub mod prober;
pub mod retry;
pub mod settings;
pub mod target;
pub mod template;
pub mod traits;
pub mod wait;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{Services, TargetContext};
pub use engine::{ActionEngine, PipelineFailure, PipelineReport, StepTiming};
pub use error::{ActionError, ErrorKind, Result};
pub use events::{
    CollectingReporter, EventReporter, NoopReporter, Phase, PipelineEvent,
    TracingReporter,
};
pub use join::{join_channel, JoinCredential, JoinPublisher, JoinSubscription};
pub use kind::{ActionKind, DEFAULT_SEQUENCE};
pub use outcome::Outcome;
pub use prober::{Prober, TcpProber};
pub use retry::{RetryPolicy, DEFAULT_MAX_RETRIES};
pub use settings::{EngineSettings, InstallSettings};
pub use target::{Target, TargetConfig, RESCUE_LOGIN};
pub use template::TemplateParams;
pub use traits::Action;
pub use wait::WaitSettings;
