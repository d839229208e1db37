//! User-supplied post-install scripts

use async_trait::async_trait;
use tracing::{debug, info};

use crate::context::TargetContext;
use crate::error::{ActionError, Result};
use crate::kind::ActionKind;
use crate::template;
use crate::traits::Action;

/// Renders the post-install script and runs it on the controller
pub struct PostInstallAction;

#[async_trait]
impl Action for PostInstallAction {
    fn kind(&self) -> ActionKind {
        ActionKind::PostInstall
    }

    fn description(&self) -> &str {
        "Run the post-install script on the controller"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let Some(source) = ctx.target.config.post_install.as_deref() else {
            debug!(host = %ctx.address(), "No post_install script");
            return Ok(());
        };

        let script = template::render("post_install", source, &ctx.template_params())?;
        info!(host = %ctx.address(), "Executing post_install:\n {}", script);
        let output = ctx
            .services
            .local
            .run(&script)
            .await
            .map_err(ActionError::LocalCommand)?;
        info!(host = %ctx.address(), "{}", output.stdout.trim_end());
        Ok(())
    }
}

/// Renders the remote post-install commands and runs them on the host,
/// one line at a time
pub struct PostInstallRemoteAction;

#[async_trait]
impl Action for PostInstallRemoteAction {
    fn kind(&self) -> ActionKind {
        ActionKind::PostInstallRemote
    }

    fn description(&self) -> &str {
        "Run the post-install commands on the host"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let Some(source) = ctx.target.config.post_install_remote.as_deref() else {
            debug!(host = %ctx.address(), "No post_install_remote commands");
            return Ok(());
        };

        let rendered = template::render("post_install_remote", source, &ctx.template_params())?;
        let session = ctx.services.remote.connect(&ctx.endpoint()).await?;
        for command in rendered.lines().map(str::trim).filter(|line| !line.is_empty()) {
            info!(host = %ctx.address(), "executing {}", command);
            session.exec_checked(command).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{target_context_with, MockServices};
    use crate::TargetConfig;

    #[tokio::test]
    async fn test_post_install_runs_locally() {
        let mocks = MockServices::new();
        let config = TargetConfig::new("10.0.0.1", "node-1", "x")
            .with_post_install("echo {{ hostname }} {{ ip }} {{ discovery_token }}");
        let mut ctx = target_context_with(&mocks, config);

        PostInstallAction.execute(&mut ctx).await.unwrap();
        assert_eq!(mocks.local.scripts(), vec!["echo node-1 10.0.0.1 test-token"]);
        assert_eq!(mocks.remote.connect_count("10.0.0.1"), 0);
    }

    #[tokio::test]
    async fn test_post_install_failure_is_local_command_error() {
        let mocks = MockServices::new();
        mocks.local.fail_all();
        let config = TargetConfig::new("10.0.0.1", "node-1", "x").with_post_install("false");
        let mut ctx = target_context_with(&mocks, config);

        let err = PostInstallAction.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::LocalCommand);
    }

    #[tokio::test]
    async fn test_missing_scripts_are_noops() {
        let mocks = MockServices::new();
        let mut ctx = target_context_with(&mocks, TargetConfig::new("10.0.0.1", "node-1", "x"));

        PostInstallAction.execute(&mut ctx).await.unwrap();
        PostInstallRemoteAction.execute(&mut ctx).await.unwrap();
        assert!(mocks.local.scripts().is_empty());
        assert_eq!(mocks.remote.connect_count("10.0.0.1"), 0);
    }

    #[tokio::test]
    async fn test_post_install_remote_runs_each_line() {
        let mocks = MockServices::new();
        let config = TargetConfig::new("10.0.0.1", "node-1", "x")
            .with_post_install_remote("sudo systemctl enable docker\n\n  echo {{ hostname }}  \n");
        let mut ctx = target_context_with(&mocks, config);

        PostInstallRemoteAction.execute(&mut ctx).await.unwrap();
        assert_eq!(
            mocks.remote.commands_for("10.0.0.1"),
            vec!["sudo systemctl enable docker", "echo node-1"]
        );
    }

    #[tokio::test]
    async fn test_post_install_remote_rejects_unknown_parameters() {
        let mocks = MockServices::new();
        let config = TargetConfig::new("10.0.0.1", "node-1", "x")
            .with_post_install_remote("echo {{ not_a_param }}");
        let mut ctx = target_context_with(&mocks, config);

        let err = PostInstallRemoteAction.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::Template { .. }));
        assert_eq!(mocks.remote.connect_count("10.0.0.1"), 0);
    }
}
