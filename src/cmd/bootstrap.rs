use clap::Args;
use color_eyre::eyre::{eyre, Result, WrapErr};
use metalstrap_actions::{Services, TcpProber, TracingReporter};
use metalstrap_provider::{EtcdDiscovery, RobotClient, RobotConfig};
use metalstrap_remote::{OpensshExecutor, OpensshKnownHosts, SystemShell};
use metalstrap_workflow::{Orchestrator, RunOptions, RunSummary};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Configuration file
    #[arg(short, long, env = "METALSTRAP_CONFIG")]
    pub config: PathBuf,

    /// Bootstrap a docker swarm: manager first, then the workers
    #[arg(long)]
    pub cluster: bool,

    /// Robot webservice user (overrides the configuration file)
    #[arg(long, env = "ROBOT_USER")]
    pub robot_user: Option<String>,

    /// Robot webservice password (overrides the configuration file)
    #[arg(long, env = "ROBOT_PASSWORD", hide_env_values = true)]
    pub robot_password: Option<String>,
}

fn services(config: &Config, args: &BootstrapArgs) -> Result<Services> {
    let user = args
        .robot_user
        .clone()
        .or_else(|| config.robot.user.clone())
        .ok_or_else(|| eyre!("no Robot user given (--robot-user or [robot] user)"))?;
    let password = args
        .robot_password
        .clone()
        .or_else(|| config.robot.password.clone())
        .ok_or_else(|| eyre!("no Robot password given (--robot-password or [robot] password)"))?;
    let mut robot = RobotConfig::new(user, password);
    if let Some(url) = &config.robot.url {
        robot = robot.with_base_url(url);
    }
    let provider = RobotClient::new(robot).wrap_err("failed to create Robot client")?;

    let settings = config.engine_settings();
    let mut executor = OpensshExecutor::new().with_port(settings.wait.port);
    let mut known_hosts = OpensshKnownHosts::new().with_port(settings.wait.port);
    if let Some(secs) = config.ssh.connect_timeout_secs {
        executor = executor.with_connect_timeout(Duration::from_secs(secs));
    }
    if let Some(identity) = &config.ssh.identity_file {
        executor = executor.with_identity_file(identity);
    }
    if let Some(file) = &config.ssh.known_hosts_file {
        executor = executor.with_known_hosts_file(file);
        known_hosts = known_hosts.with_file(file);
    }

    Ok(Services {
        provider: Arc::new(provider),
        remote: Arc::new(executor),
        known_hosts: Arc::new(known_hosts),
        local: Arc::new(SystemShell),
        prober: Arc::new(TcpProber),
    })
}

/// Run the bootstrap described by the configuration file
pub async fn run_bootstrap(args: BootstrapArgs) -> Result<RunSummary> {
    let config = Config::load(&args.config)?;
    let targets = config.target_configs()?;
    let cluster = args.cluster || config.cluster;

    let mut orchestrator = Orchestrator::new(
        services(&config, &args)?,
        Arc::new(EtcdDiscovery::new(&config.discovery.url)),
    )
    .with_settings(config.engine_settings())
    .with_reporter(Arc::new(TracingReporter));
    for target in targets {
        orchestrator.add_target(target)?;
    }

    info!(
        targets = orchestrator.targets().len(),
        cluster, "Starting bootstrap"
    );
    let summary = orchestrator.run(RunOptions { cluster }).await?;
    Ok(summary)
}
