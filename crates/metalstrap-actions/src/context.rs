//! Per-host execution context
//!
//! Everything an action may touch is reachable from its [`TargetContext`]:
//! the host's own state, the collaborators, the run-wide settings and
//! discovery token, and (for a cluster manager) the join publisher. Nothing
//! is looked up globally.

use metalstrap_provider::ProvisioningApi;
use metalstrap_remote::{Endpoint, KnownHosts, LocalShell, RemoteExecutor};
use std::sync::Arc;

use crate::error::{ActionError, Result};
use crate::events::{EventReporter, NoopReporter, PipelineEvent};
use crate::join::{JoinCredential, JoinPublisher};
use crate::prober::Prober;
use crate::settings::EngineSettings;
use crate::target::Target;
use crate::template::TemplateParams;

/// Collaborators shared by all pipelines of a run
#[derive(Clone)]
pub struct Services {
    pub provider: Arc<dyn ProvisioningApi>,
    pub remote: Arc<dyn RemoteExecutor>,
    pub known_hosts: Arc<dyn KnownHosts>,
    pub local: Arc<dyn LocalShell>,
    pub prober: Arc<dyn Prober>,
}

/// Context a host's actions run in
pub struct TargetContext {
    /// The host and its accumulated state
    pub target: Target,
    pub services: Services,
    pub settings: Arc<EngineSettings>,
    discovery_token: Arc<str>,
    reporter: Arc<dyn EventReporter>,
    cluster: bool,
    join_publisher: Option<JoinPublisher>,
}

impl TargetContext {
    pub fn new(
        target: Target,
        services: Services,
        settings: Arc<EngineSettings>,
        discovery_token: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            target,
            services,
            settings,
            discovery_token: discovery_token.into(),
            reporter: Arc::new(NoopReporter),
            cluster: false,
            join_publisher: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn EventReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Enable the cluster-join action
    pub fn with_cluster(mut self, cluster: bool) -> Self {
        self.cluster = cluster;
        self
    }

    /// Make this the cluster manager, publishing through `publisher`
    pub fn with_join_publisher(mut self, publisher: JoinPublisher) -> Self {
        self.target.is_manager = true;
        self.join_publisher = Some(publisher);
        self
    }

    /// Make this a cluster worker joining with `credential`
    pub fn with_join_credential(mut self, credential: JoinCredential) -> Self {
        self.target.is_manager = false;
        self.target.join_token = Some(credential.token);
        self.target.join_address = Some(credential.address);
        self
    }

    pub fn discovery_token(&self) -> &str {
        &self.discovery_token
    }

    pub fn is_cluster(&self) -> bool {
        self.cluster
    }

    pub fn address(&self) -> &str {
        self.target.address()
    }

    /// Login endpoint for the host's current state
    ///
    /// The rescue password is offered only until the installation has been
    /// verified.
    pub fn endpoint(&self) -> Endpoint {
        let password = if self.target.installed {
            None
        } else {
            self.target.password.clone()
        };
        Endpoint::new(self.target.address(), self.target.login.clone()).with_password(password)
    }

    pub fn template_params(&self) -> TemplateParams {
        TemplateParams::for_target(&self.target, &self.discovery_token)
    }

    pub fn report(&self, event: PipelineEvent) {
        self.reporter.report(event);
    }

    /// Hand the join credential to the orchestrator
    pub fn publish_join(&mut self, credential: JoinCredential) -> Result<()> {
        match self.join_publisher.as_mut() {
            Some(publisher) => publisher.publish(credential),
            None => Err(ActionError::Cluster(format!(
                "{} is not the cluster manager",
                self.target.address()
            ))),
        }
    }
}
