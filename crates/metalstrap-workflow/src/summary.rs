//! Per-host results of a run

use metalstrap_actions::{ActionKind, ErrorKind, PipelineFailure, PipelineReport, StepTiming};
use std::fmt;
use std::time::Duration;

/// Part a host played in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Non-cluster mode
    Standalone,
    Manager,
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Standalone => "standalone",
            Role::Manager => "manager",
            Role::Worker => "worker",
        })
    }
}

/// How a host's pipeline ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    Succeeded,
    /// Stopped at `action`
    Failed {
        action: ActionKind,
        kind: ErrorKind,
        message: String,
    },
    /// The host's task died before the pipeline finished
    Aborted { message: String },
}

/// Result of one host's pipeline
#[derive(Debug, Clone)]
pub struct HostReport {
    pub address: String,
    pub hostname: String,
    pub role: Role,
    pub outcome: HostOutcome,
    /// Steps that completed, with their timings
    pub steps: Vec<StepTiming>,
    pub elapsed: Duration,
}

impl HostReport {
    pub(crate) fn from_pipeline(
        address: String,
        hostname: String,
        role: Role,
        result: &std::result::Result<PipelineReport, PipelineFailure>,
        elapsed: Duration,
    ) -> Self {
        let (outcome, steps) = match result {
            Ok(report) => (HostOutcome::Succeeded, report.steps.clone()),
            Err(failure) => (
                HostOutcome::Failed {
                    action: failure.action,
                    kind: failure.error.kind(),
                    message: failure.error.to_string(),
                },
                failure.completed.clone(),
            ),
        };
        Self {
            address,
            hostname,
            role,
            outcome,
            steps,
            elapsed,
        }
    }

    pub(crate) fn aborted(address: String, hostname: String, role: Role, message: String) -> Self {
        Self {
            address,
            hostname,
            role,
            outcome: HostOutcome::Aborted { message },
            steps: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == HostOutcome::Succeeded
    }
}

impl fmt::Display for HostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}] ", self.address, self.hostname, self.role)?;
        match &self.outcome {
            HostOutcome::Succeeded => {
                write!(f, "succeeded in {:.1}s", self.elapsed.as_secs_f64())
            }
            HostOutcome::Failed {
                action,
                kind,
                message,
            } => write!(f, "failed at {action} ({kind}): {message}"),
            HostOutcome::Aborted { message } => write!(f, "aborted: {message}"),
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Token every host was handed
    pub discovery_token: String,
    /// One report per host, manager first in cluster mode, then in
    /// configuration order
    pub hosts: Vec<HostReport>,
}

impl RunSummary {
    pub fn host(&self, address: &str) -> Option<&HostReport> {
        self.hosts.iter().find(|host| host.address == address)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts.iter().filter(|host| host.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts.iter().filter(|host| !host.succeeded())
    }

    /// True when every host succeeded
    pub fn is_success(&self) -> bool {
        self.hosts.iter().all(HostReport::succeeded)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for host in &self.hosts {
            writeln!(f, "{host}")?;
        }
        write!(f, "discovery token: {}", self.discovery_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(address: &str, outcome: HostOutcome) -> HostReport {
        HostReport {
            address: address.to_string(),
            hostname: format!("host-{address}"),
            role: Role::Standalone,
            outcome,
            steps: Vec::new(),
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_summary_counts_and_display() {
        let summary = RunSummary {
            discovery_token: "abc123".to_string(),
            hosts: vec![
                report("10.0.0.1", HostOutcome::Succeeded),
                report(
                    "10.0.0.2",
                    HostOutcome::Failed {
                        action: ActionKind::InstallImage,
                        kind: ErrorKind::Transport,
                        message: "connection refused".to_string(),
                    },
                ),
            ],
        };

        assert!(!summary.is_success());
        assert_eq!(summary.succeeded().count(), 1);
        assert_eq!(summary.failed().count(), 1);
        assert!(summary.host("10.0.0.2").is_some());

        let text = summary.to_string();
        assert!(text.contains("10.0.0.1 (host-10.0.0.1) [standalone] succeeded in 1.5s"));
        assert!(text.contains("failed at installimage (transport): connection refused"));
        assert!(text.ends_with("discovery token: abc123"));
    }
}
