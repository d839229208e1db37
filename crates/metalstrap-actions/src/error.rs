//! Error types for pipeline actions
//!
//! Every error a host's pipeline can stop on, grouped by [`ErrorKind`] for
//! reporting.

use metalstrap_remote::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::kind::ActionKind;

/// Error type for action execution
#[derive(Debug, Error)]
pub enum ActionError {
    /// A retried provider operation kept failing
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Provisioning {
        operation: String,
        attempts: u32,
        last: String,
    },

    /// The installed system does not look like the one we configured
    #[error("hostnames do not match: assumed '{expected}' but received '{observed}'")]
    Verification { expected: String, observed: String },

    /// A template could not be rendered
    #[error("failed to render {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// No handler is registered for a step
    #[error("no handler registered for action {0}")]
    NotRegistered(ActionKind),

    /// Invalid target or engine configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Talking to the host failed
    #[error("transport error: {0}")]
    Transport(#[from] RemoteError),

    /// A script run on the controller failed
    #[error("local command failed: {0}")]
    LocalCommand(#[source] RemoteError),

    /// The cluster join hand-off could not be completed
    #[error("cluster join failed: {0}")]
    Cluster(String),
}

impl ActionError {
    /// Reporting category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::Provisioning { .. } => ErrorKind::Provisioning,
            ActionError::Verification { .. } => ErrorKind::Verification,
            ActionError::Template { .. }
            | ActionError::NotRegistered(_)
            | ActionError::InvalidConfiguration(_) => ErrorKind::Configuration,
            ActionError::Transport(_) => ErrorKind::Transport,
            ActionError::LocalCommand(_) => ErrorKind::LocalCommand,
            ActionError::Cluster(_) => ErrorKind::Cluster,
        }
    }
}

/// Reporting category of an [`ActionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Provisioning,
    Verification,
    Configuration,
    Transport,
    LocalCommand,
    Cluster,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Provisioning => "provisioning",
            ErrorKind::Verification => "verification",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::LocalCommand => "local-command",
            ErrorKind::Cluster => "cluster",
        };
        f.write_str(name)
    }
}

/// Result type for action operations
pub type Result<T> = std::result::Result<T, ActionError>;
