//! Structured pipeline events
//!
//! Every action start and finish, every recovered condition and every host
//! failure is emitted as a [`PipelineEvent`] to an [`EventReporter`], next to
//! the human-readable log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::ErrorKind;
use crate::kind::ActionKind;

/// Where in its lifecycle an action is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Start,
    Finished,
}

/// Event emitted while a host's pipeline runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// An action started or finished
    Action {
        timestamp: DateTime<Utc>,
        host: String,
        action: ActionKind,
        phase: Phase,
        /// Set on `Finished`
        #[serde(skip_serializing_if = "Option::is_none")]
        elapsed_secs: Option<f64>,
    },
    /// An expected failure was repaired and the action carried on
    Recovered {
        timestamp: DateTime<Utc>,
        host: String,
        action: ActionKind,
        note: String,
    },
    /// The host's pipeline stopped on an error
    HostFailed {
        timestamp: DateTime<Utc>,
        host: String,
        action: ActionKind,
        kind: ErrorKind,
        message: String,
    },
}

impl PipelineEvent {
    pub fn started(host: impl Into<String>, action: ActionKind) -> Self {
        PipelineEvent::Action {
            timestamp: Utc::now(),
            host: host.into(),
            action,
            phase: Phase::Start,
            elapsed_secs: None,
        }
    }

    pub fn finished(host: impl Into<String>, action: ActionKind, elapsed: Duration) -> Self {
        PipelineEvent::Action {
            timestamp: Utc::now(),
            host: host.into(),
            action,
            phase: Phase::Finished,
            elapsed_secs: Some(elapsed.as_secs_f64()),
        }
    }

    pub fn recovered(host: impl Into<String>, action: ActionKind, note: impl Into<String>) -> Self {
        PipelineEvent::Recovered {
            timestamp: Utc::now(),
            host: host.into(),
            action,
            note: note.into(),
        }
    }

    pub fn host_failed(
        host: impl Into<String>,
        action: ActionKind,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        PipelineEvent::HostFailed {
            timestamp: Utc::now(),
            host: host.into(),
            action,
            kind,
            message: message.into(),
        }
    }

    pub fn host(&self) -> &str {
        match self {
            PipelineEvent::Action { host, .. }
            | PipelineEvent::Recovered { host, .. }
            | PipelineEvent::HostFailed { host, .. } => host,
        }
    }

    pub fn action(&self) -> ActionKind {
        match self {
            PipelineEvent::Action { action, .. }
            | PipelineEvent::Recovered { action, .. }
            | PipelineEvent::HostFailed { action, .. } => *action,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            PipelineEvent::Action { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Receives pipeline events
pub trait EventReporter: Send + Sync {
    fn report(&self, event: PipelineEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone)]
pub struct NoopReporter;

impl EventReporter for NoopReporter {
    fn report(&self, _event: PipelineEvent) {}
}

/// Writes every event to the `tracing` log at debug level
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl EventReporter for TracingReporter {
    fn report(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::Action {
                host,
                action,
                phase,
                elapsed_secs,
                ..
            } => debug!(host = %host, action = %action, phase = ?phase, elapsed_secs, "Pipeline event"),
            PipelineEvent::Recovered { host, action, note, .. } => {
                debug!(host = %host, action = %action, note = %note, "Pipeline recovered")
            }
            PipelineEvent::HostFailed {
                host,
                action,
                kind,
                message,
                ..
            } => debug!(host = %host, action = %action, kind = %kind, message = %message, "Pipeline failed"),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: std::sync::Mutex<Vec<PipelineEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events concerning `host`, in emission order
    pub fn events_for(&self, host: &str) -> Vec<PipelineEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.host() == host)
            .collect()
    }
}

impl EventReporter for CollectingReporter {
    fn report(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
