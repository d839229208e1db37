//! Bootstrap orchestration
//!
//! The [`Orchestrator`] fetches the discovery token once, then runs one
//! `tokio` task per host. In cluster mode the manager's task runs alone
//! first; the workers are only spawned after it has finished and its join
//! credential has been received.

use metalstrap_actions::{
    join_channel, ActionEngine, ActionKind, EngineSettings, EventReporter, JoinCredential,
    NoopReporter, PipelineFailure, PipelineReport, Services, Target, TargetConfig, TargetContext,
    DEFAULT_SEQUENCE,
};
use metalstrap_provider::DiscoveryTokenSource;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};

use crate::cluster::partition;
use crate::error::{Result, RunError};
use crate::summary::{HostReport, Role, RunSummary};

/// Per-run options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run the manager first and join the others to its cluster
    pub cluster: bool,
}

type PipelineResult = std::result::Result<PipelineReport, PipelineFailure>;

/// A spawned host pipeline
struct HostTask {
    address: String,
    hostname: String,
    role: Role,
    handle: JoinHandle<(PipelineResult, Duration)>,
}

impl HostTask {
    async fn finish(self) -> (HostReport, Option<PipelineFailure>) {
        match self.handle.await {
            Ok((result, elapsed)) => {
                let report = HostReport::from_pipeline(
                    self.address,
                    self.hostname,
                    self.role,
                    &result,
                    elapsed,
                );
                (report, result.err())
            }
            Err(err) => {
                error!(host = %self.address, error = %err, "Pipeline task died");
                let report =
                    HostReport::aborted(self.address, self.hostname, self.role, err.to_string());
                (report, None)
            }
        }
    }
}

/// Drives a bootstrap run over a set of targets
pub struct Orchestrator {
    services: Services,
    discovery: Arc<dyn DiscoveryTokenSource>,
    engine: Arc<ActionEngine>,
    settings: Arc<EngineSettings>,
    reporter: Arc<dyn EventReporter>,
    default_actions: Vec<ActionKind>,
    targets: Vec<TargetConfig>,
}

impl Orchestrator {
    /// An orchestrator with the built-in handlers and default settings
    pub fn new(services: Services, discovery: Arc<dyn DiscoveryTokenSource>) -> Self {
        Self {
            services,
            discovery,
            engine: Arc::new(ActionEngine::with_builtin_actions()),
            settings: Arc::new(EngineSettings::default()),
            reporter: Arc::new(NoopReporter),
            default_actions: DEFAULT_SEQUENCE.to_vec(),
            targets: Vec::new(),
        }
    }

    pub fn with_engine(mut self, engine: ActionEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn EventReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sequence for targets that do not bring their own
    pub fn with_default_actions(mut self, actions: Vec<ActionKind>) -> Self {
        self.default_actions = actions;
        self
    }

    /// Add a target, rejecting configurations no pipeline could run
    pub fn add_target(&mut self, config: TargetConfig) -> Result<()> {
        config.validate().map_err(RunError::InvalidTarget)?;
        let actions = config.actions.as_deref().unwrap_or(&self.default_actions);
        self.engine
            .validate_sequence(actions)
            .map_err(RunError::InvalidTarget)?;
        self.targets.push(config);
        Ok(())
    }

    pub fn targets(&self) -> &[TargetConfig] {
        &self.targets
    }

    /// Bootstrap every target
    ///
    /// Host failures are recorded in the summary. Only a missing discovery
    /// token, an invalid manager partition or a failed manager abort the
    /// run.
    pub async fn run(&self, options: RunOptions) -> Result<RunSummary> {
        if self.targets.is_empty() {
            return Err(RunError::NoTargets);
        }
        // Partition before any external call
        let partition = if options.cluster {
            Some(partition(&self.targets)?)
        } else {
            None
        };

        let discovery_token: Arc<str> = self
            .discovery
            .fetch_token()
            .await
            .map_err(RunError::DiscoveryToken)?
            .into();
        info!(discovery_token = %discovery_token, "Acquired discovery token");

        let mut hosts = Vec::with_capacity(self.targets.len());
        let tasks = match partition {
            Some(partition) => {
                let (manager_report, credential) =
                    self.run_manager(partition.manager, &discovery_token).await?;
                hosts.push(manager_report);

                info!(
                    join_address = %credential.address,
                    workers = partition.workers.len(),
                    "Starting workers"
                );
                partition
                    .workers
                    .into_iter()
                    .map(|config| {
                        let ctx = self
                            .context(config, &discovery_token)
                            .with_cluster(true)
                            .with_join_credential(credential.clone());
                        self.spawn(ctx, Role::Worker)
                    })
                    .collect::<Vec<_>>()
            }
            None => self
                .targets
                .iter()
                .cloned()
                .map(|config| self.spawn(self.context(config, &discovery_token), Role::Standalone))
                .collect(),
        };

        for task in tasks {
            let (report, _) = task.finish().await;
            hosts.push(report);
        }

        let summary = RunSummary {
            discovery_token: discovery_token.to_string(),
            hosts,
        };
        for host in summary.failed() {
            error!(host = %host.address, "{}", host);
        }
        info!(
            succeeded = summary.succeeded().count(),
            failed = summary.failed().count(),
            "DONE!"
        );
        info!("discovery token: {}", summary.discovery_token);
        Ok(summary)
    }

    /// Run the manager alone and collect its join credential
    async fn run_manager(
        &self,
        config: TargetConfig,
        discovery_token: &Arc<str>,
    ) -> Result<(HostReport, JoinCredential)> {
        let host = config.ip.clone();
        info!(host = %host, "Bootstrapping cluster manager");

        let (publisher, subscription) = join_channel();
        let ctx = self
            .context(config, discovery_token)
            .with_cluster(true)
            .with_join_publisher(publisher);

        // Awaiting the task is what orders every worker after the manager
        let (report, failure) = self.spawn(ctx, Role::Manager).finish().await;
        if let Some(failure) = failure {
            return Err(RunError::ManagerFailed {
                host,
                action: failure.action,
                source: failure.error,
            });
        }
        if !report.succeeded() {
            let message = match report.outcome {
                crate::summary::HostOutcome::Aborted { message } => message,
                _ => "pipeline did not complete".to_string(),
            };
            return Err(RunError::ManagerAborted { host, message });
        }

        let credential = subscription
            .credential()
            .await
            .ok_or_else(|| RunError::CredentialNotPublished { host: host.clone() })?;
        Ok((report, credential))
    }

    fn context(&self, config: TargetConfig, discovery_token: &Arc<str>) -> TargetContext {
        let target = Target::new(config, &self.default_actions);
        TargetContext::new(
            target,
            self.services.clone(),
            self.settings.clone(),
            discovery_token.clone(),
        )
        .with_reporter(self.reporter.clone())
    }

    fn spawn(&self, mut ctx: TargetContext, role: Role) -> HostTask {
        let address = ctx.address().to_string();
        let hostname = ctx.target.hostname().to_string();
        let engine = self.engine.clone();
        let span = info_span!("target", host = %address);

        let handle = tokio::spawn(
            async move {
                let started = Instant::now();
                let result = engine.run_pipeline(&mut ctx).await;
                (result, started.elapsed())
            }
            .instrument(span),
        );

        HostTask {
            address,
            hostname,
            role,
            handle,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("engine", &self.engine)
            .field("settings", &self.settings)
            .field("default_actions", &self.default_actions)
            .field("targets", &self.targets.len())
            .finish()
    }
}
