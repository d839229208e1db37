//! Per-host pipeline execution
//!
//! The [`ActionEngine`] binds every [`ActionKind`] to a handler once and
//! runs a target's step list strictly in order, timing each step and
//! stopping at the first error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::context::TargetContext;
use crate::error::{ActionError, Result};
use crate::events::PipelineEvent;
use crate::kind::ActionKind;
use crate::traits::Action;

/// Registry of step handlers
pub struct ActionEngine {
    actions: HashMap<ActionKind, Arc<dyn Action>>,
}

impl Default for ActionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing of one completed step
#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub action: ActionKind,
    pub elapsed: Duration,
}

/// A pipeline that ran every step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub steps: Vec<StepTiming>,
}

/// A pipeline stopped by a failing step
#[derive(Debug)]
pub struct PipelineFailure {
    /// The step that failed
    pub action: ActionKind,
    pub error: ActionError,
    /// Steps that completed before it
    pub completed: Vec<StepTiming>,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.action, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl ActionEngine {
    /// An engine with no handlers
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// An engine with a handler for every [`ActionKind`]
    pub fn with_builtin_actions() -> Self {
        let mut engine = Self::new();
        crate::actions::register_all(&mut engine);
        engine
    }

    /// Register a handler, replacing any previous one for the same step
    pub fn register<A: Action + 'static>(&mut self, action: A) {
        self.actions.insert(action.kind(), Arc::new(action));
    }

    pub fn has_action(&self, kind: ActionKind) -> bool {
        self.actions.contains_key(&kind)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Check that every step of `sequence` has a handler
    pub fn validate_sequence(&self, sequence: &[ActionKind]) -> Result<()> {
        match sequence.iter().find(|kind| !self.has_action(**kind)) {
            Some(kind) => Err(ActionError::NotRegistered(*kind)),
            None => Ok(()),
        }
    }

    /// Run a single step
    pub async fn execute(&self, kind: ActionKind, ctx: &mut TargetContext) -> Result<()> {
        let action = self
            .actions
            .get(&kind)
            .cloned()
            .ok_or(ActionError::NotRegistered(kind))?;
        action.execute(ctx).await
    }

    /// Run the target's steps in order, stopping at the first failure
    ///
    /// The failure is logged and reported here; the caller only has to
    /// record it.
    pub async fn run_pipeline(
        &self,
        ctx: &mut TargetContext,
    ) -> std::result::Result<PipelineReport, PipelineFailure> {
        let address = ctx.address().to_string();
        let sequence = ctx.target.actions.clone();
        let mut report = PipelineReport::default();

        for kind in sequence {
            info!(host = %address, action = %kind, "[{}] START", kind);
            ctx.report(PipelineEvent::started(&address, kind));

            let start = Instant::now();
            let result = self.execute(kind, ctx).await;
            let elapsed = start.elapsed();

            match result {
                Ok(()) => {
                    ctx.target.retries = 0;
                    info!(
                        host = %address,
                        action = %kind,
                        elapsed_secs = elapsed.as_secs_f64(),
                        "[{}] FINISHED in {:.5} seconds",
                        kind,
                        elapsed.as_secs_f64()
                    );
                    ctx.report(PipelineEvent::finished(&address, kind, elapsed));
                    report.steps.push(StepTiming {
                        action: kind,
                        elapsed,
                    });
                }
                Err(err) => {
                    let error_kind = err.kind();
                    error!(
                        host = %address,
                        action = %kind,
                        kind = %error_kind,
                        retries = ctx.target.retries,
                        "[{}] {}: {}",
                        kind,
                        error_kind,
                        err
                    );
                    ctx.report(PipelineEvent::host_failed(
                        &address,
                        kind,
                        error_kind,
                        err.to_string(),
                    ));
                    return Err(PipelineFailure {
                        action: kind,
                        error: err,
                        completed: report.steps,
                    });
                }
            }
        }

        Ok(report)
    }
}

impl std::fmt::Debug for ActionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&ActionKind> = self.actions.keys().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        f.debug_struct("ActionEngine")
            .field("actions", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingReporter, Phase};
    use crate::kind::DEFAULT_SEQUENCE;
    use crate::testing::{target_context, target_context_with, MockServices};
    use crate::TargetConfig;
    use async_trait::async_trait;

    struct FailingAction;

    #[async_trait]
    impl Action for FailingAction {
        fn kind(&self) -> ActionKind {
            ActionKind::ConfigureRoute
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn execute(&self, _ctx: &mut TargetContext) -> Result<()> {
            Err(ActionError::InvalidConfiguration("intentional failure".to_string()))
        }
    }

    #[test]
    fn test_engine_new() {
        let engine = ActionEngine::new();
        assert_eq!(engine.action_count(), 0);
        assert!(engine.validate_sequence(&[]).is_ok());
    }

    #[test]
    fn test_builtin_actions_cover_every_kind() {
        let engine = ActionEngine::with_builtin_actions();
        assert_eq!(engine.action_count(), ActionKind::ALL.len());
        for kind in ActionKind::ALL {
            assert!(engine.has_action(kind), "missing handler for {kind}");
        }
        assert!(engine.validate_sequence(&DEFAULT_SEQUENCE).is_ok());
    }

    #[test]
    fn test_validate_sequence_names_missing_handler() {
        let mut engine = ActionEngine::new();
        engine.register(FailingAction);
        let err = engine
            .validate_sequence(&[ActionKind::ConfigureRoute, ActionKind::Reboot])
            .unwrap_err();
        assert!(matches!(err, ActionError::NotRegistered(ActionKind::Reboot)));
    }

    #[tokio::test]
    async fn test_execute_not_registered() {
        let mocks = MockServices::new();
        let mut ctx = target_context(&mocks, "10.0.0.1", "node-1");
        let engine = ActionEngine::new();

        let err = engine.execute(ActionKind::Reboot, &mut ctx).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_default_pipeline_runs_every_step_in_order() {
        let mocks = MockServices::new();
        mocks.remote.set_hostname("10.0.0.1", "node-1");
        let reporter = Arc::new(CollectingReporter::new());
        let mut ctx = target_context(&mocks, "10.0.0.1", "node-1").with_reporter(reporter.clone());

        let engine = ActionEngine::with_builtin_actions();
        let report = engine.run_pipeline(&mut ctx).await.unwrap();

        let ran: Vec<ActionKind> = report.steps.iter().map(|step| step.action).collect();
        assert_eq!(ran, DEFAULT_SEQUENCE.to_vec());

        // START k, FINISHED k, START k+1, ...
        let events = reporter.events_for("10.0.0.1");
        assert_eq!(events.len(), DEFAULT_SEQUENCE.len() * 2);
        for (i, pair) in events.chunks(2).enumerate() {
            assert_eq!(pair[0].phase(), Some(Phase::Start));
            assert_eq!(pair[1].phase(), Some(Phase::Finished));
            assert_eq!(pair[0].action(), DEFAULT_SEQUENCE[i]);
            assert_eq!(pair[1].action(), DEFAULT_SEQUENCE[i]);
        }

        assert!(ctx.target.installed);
        assert_eq!(ctx.target.login, "core");
        assert_eq!(ctx.target.retries, 0);
        assert_eq!(mocks.provider.count("activate"), 1);
        assert_eq!(mocks.provider.count("reset"), 1);
    }

    #[tokio::test]
    async fn test_pipeline_stops_at_first_failure() {
        let mocks = MockServices::new();
        mocks.remote.fail_command("10.0.0.1", "coreos-install -d");
        let reporter = Arc::new(CollectingReporter::new());
        let mut ctx = target_context(&mocks, "10.0.0.1", "node-1").with_reporter(reporter.clone());

        let engine = ActionEngine::with_builtin_actions();
        let failure = engine.run_pipeline(&mut ctx).await.unwrap_err();

        assert_eq!(failure.action, ActionKind::InstallImage);
        assert_eq!(failure.error.kind(), crate::ErrorKind::Transport);
        assert_eq!(failure.completed.len(), 6);
        assert!(failure.to_string().starts_with("installimage failed"));

        let events = reporter.events();
        let last = events.last().unwrap();
        assert!(matches!(last, PipelineEvent::HostFailed { action: ActionKind::InstallImage, .. }));
        assert!(!events.iter().any(|e| e.action() == ActionKind::Reboot));
        assert_eq!(mocks.remote.commands_for("10.0.0.1").iter().filter(|c| *c == "reboot").count(), 0);
    }

    #[tokio::test]
    async fn test_retry_counter_resets_between_steps() {
        let mocks = MockServices::new();
        mocks.provider.fail_rescue(2);
        mocks.provider.fail_reset(3);
        let config = TargetConfig::new("10.0.0.1", "node-1", "x")
            .with_actions(vec![ActionKind::EnableRescueMode, ActionKind::Reset]);
        let mut ctx = target_context_with(&mocks, config);

        // Three failures on reset would exhaust a counter carried over from
        // the rescue step's two
        let engine = ActionEngine::with_builtin_actions();
        engine.run_pipeline(&mut ctx).await.unwrap();
        assert_eq!(mocks.provider.count("reset"), 4);
        assert_eq!(ctx.target.retries, 0);
    }

    #[tokio::test]
    async fn test_custom_handler_failure_is_reported() {
        let mocks = MockServices::new();
        let config = TargetConfig::new("10.0.0.1", "node-1", "x")
            .with_actions(vec![ActionKind::ConfigureRoute]);
        let reporter = Arc::new(CollectingReporter::new());
        let mut ctx = target_context_with(&mocks, config).with_reporter(reporter.clone());

        let mut engine = ActionEngine::new();
        engine.register(FailingAction);
        let failure = engine.run_pipeline(&mut ctx).await.unwrap_err();

        assert!(failure.completed.is_empty());
        match &reporter.events()[1] {
            PipelineEvent::HostFailed { kind, message, .. } => {
                assert_eq!(*kind, crate::ErrorKind::Configuration);
                assert!(message.contains("intentional failure"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
