//! Error types for bootstrap runs
//!
//! These stop a whole run. Failures of a single host are not errors at this
//! level; they end up in the [`RunSummary`](crate::RunSummary).

use metalstrap_actions::{ActionError, ActionKind};
use metalstrap_provider::ProviderError;
use thiserror::Error;

/// Error that aborts a run before or during fan-out
#[derive(Debug, Error)]
pub enum RunError {
    /// Nothing to bootstrap
    #[error("no targets to bootstrap")]
    NoTargets,

    /// Cluster mode needs a single manager
    #[error("more than one target is flagged as manager: {}", .0.join(", "))]
    MultipleManagers(Vec<String>),

    /// A target failed validation when it was added
    #[error("invalid target: {0}")]
    InvalidTarget(#[source] ActionError),

    /// The shared discovery token could not be fetched
    #[error("failed to acquire discovery token: {0}")]
    DiscoveryToken(#[source] ProviderError),

    /// The cluster manager's pipeline failed; no worker was started
    #[error("manager {host} failed at {action}: {source}")]
    ManagerFailed {
        host: String,
        action: ActionKind,
        #[source]
        source: ActionError,
    },

    /// The cluster manager's task died before finishing
    #[error("manager {host} did not finish: {message}")]
    ManagerAborted { host: String, message: String },

    /// The cluster manager finished without handing out a join credential
    #[error("manager {host} finished without publishing a join credential")]
    CredentialNotPublished { host: String },
}

/// Result type for run operations
pub type Result<T> = std::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RunError::MultipleManagers(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
        assert_eq!(
            err.to_string(),
            "more than one target is flagged as manager: 10.0.0.1, 10.0.0.2"
        );

        let err = RunError::ManagerFailed {
            host: "10.0.0.1".to_string(),
            action: ActionKind::DockerSwarm,
            source: ActionError::Cluster("no token".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "manager 10.0.0.1 failed at docker_swarm: cluster join failed: no token"
        );
    }
}
