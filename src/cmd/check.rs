use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use metalstrap_actions::{template, ActionEngine, DEFAULT_SEQUENCE};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Configuration file
    #[arg(short, long, env = "METALSTRAP_CONFIG")]
    pub config: PathBuf,

    /// Check the manager partition as for a cluster run
    #[arg(long)]
    pub cluster: bool,
}

/// Load and validate a configuration without contacting anything
pub fn run_check(args: CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let targets = config.target_configs()?;
    let engine = ActionEngine::with_builtin_actions();

    for target in &targets {
        target.validate()?;
        let actions = target.actions.as_deref().unwrap_or(&DEFAULT_SEQUENCE);
        engine.validate_sequence(actions)?;

        template::check_syntax("cloud config", &target.cloud_config)
            .wrap_err_with(|| format!("in cloud config of {}", target.ip))?;
        if let Some(script) = &target.post_install {
            template::check_syntax("post_install", script)
                .wrap_err_with(|| format!("in post_install of {}", target.ip))?;
        }
        if let Some(commands) = &target.post_install_remote {
            template::check_syntax("post_install_remote", commands)
                .wrap_err_with(|| format!("in post_install_remote of {}", target.ip))?;
        }
        info!(host = %target.ip, hostname = %target.hostname, steps = actions.len(), "Target OK");
    }

    if args.cluster || config.cluster {
        let partition = metalstrap_workflow::partition(&targets)?;
        println!(
            "manager: {} ({}), workers: {}",
            partition.manager.ip,
            partition.manager.hostname,
            partition.workers.len()
        );
    } else if targets.is_empty() {
        return Err(metalstrap_workflow::RunError::NoTargets.into());
    }

    println!("configuration OK: {} targets", targets.len());
    Ok(())
}
