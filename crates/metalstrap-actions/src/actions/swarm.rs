//! Docker swarm cluster join

use async_trait::async_trait;
use metalstrap_remote::shell_quote;
use tracing::{debug, info};

use crate::context::TargetContext;
use crate::error::{ActionError, Result};
use crate::join::JoinCredential;
use crate::kind::ActionKind;
use crate::traits::Action;

pub const SWARM_INIT: &str = "docker swarm init";
pub const SWARM_JOIN_TOKEN: &str = "docker swarm join-token worker -q";

/// Initialises the swarm on the manager and publishes its join credential,
/// or joins a worker to it
///
/// Does nothing unless the run is in cluster mode.
pub struct DockerSwarmAction;

impl DockerSwarmAction {
    async fn init_manager(&self, ctx: &mut TargetContext) -> Result<()> {
        let session = ctx.services.remote.connect(&ctx.endpoint()).await?;
        info!(host = %ctx.address(), "executing {}", SWARM_INIT);
        session.exec_checked(SWARM_INIT).await?;

        info!(host = %ctx.address(), "executing {}", SWARM_JOIN_TOKEN);
        let token = session.exec_checked(SWARM_JOIN_TOKEN).await?.trim().to_string();
        if token.is_empty() {
            return Err(ActionError::Cluster(format!(
                "{} returned an empty join token",
                ctx.address()
            )));
        }
        info!(host = %ctx.address(), "got join token {}", token);

        let address = ctx.address().to_string();
        ctx.publish_join(JoinCredential { token, address })
    }

    async fn join_worker(&self, ctx: &TargetContext) -> Result<()> {
        let (Some(token), Some(address)) = (&ctx.target.join_token, &ctx.target.join_address)
        else {
            return Err(ActionError::Cluster(format!(
                "{} has no join credential",
                ctx.address()
            )));
        };

        let command = format!(
            "docker swarm join --token {} {}",
            shell_quote(token),
            shell_quote(address)
        );
        let session = ctx.services.remote.connect(&ctx.endpoint()).await?;
        info!(host = %ctx.address(), "executing {}", command);
        session.exec_checked(&command).await?;
        Ok(())
    }
}

#[async_trait]
impl Action for DockerSwarmAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DockerSwarm
    }

    fn description(&self) -> &str {
        "Initialise or join the docker swarm"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        if !ctx.is_cluster() {
            debug!(host = %ctx.address(), "Not in cluster mode");
            return Ok(());
        }
        if ctx.target.is_manager {
            self.init_manager(ctx).await
        } else {
            self.join_worker(ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::join_channel;
    use crate::testing::{target_context, MockServices};

    #[tokio::test]
    async fn test_noop_outside_cluster_mode() {
        let mocks = MockServices::new();
        let mut ctx = target_context(&mocks, "10.0.0.1", "node-1");

        DockerSwarmAction.execute(&mut ctx).await.unwrap();
        assert_eq!(mocks.remote.connect_count("10.0.0.1"), 0);
    }

    #[tokio::test]
    async fn test_manager_publishes_credential() {
        let mocks = MockServices::new();
        mocks.remote.set_join_token("SWMTKN-1-abc");
        let (publisher, subscription) = join_channel();
        let mut ctx = target_context(&mocks, "10.0.0.1", "node-1")
            .with_cluster(true)
            .with_join_publisher(publisher);

        DockerSwarmAction.execute(&mut ctx).await.unwrap();
        drop(ctx);

        assert_eq!(
            mocks.remote.commands_for("10.0.0.1"),
            vec![SWARM_INIT, SWARM_JOIN_TOKEN]
        );
        let credential = subscription.credential().await.unwrap();
        assert_eq!(credential.token, "SWMTKN-1-abc");
        assert_eq!(credential.address, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_worker_joins_with_credential() {
        let mocks = MockServices::new();
        let mut ctx = target_context(&mocks, "10.0.0.2", "node-2")
            .with_cluster(true)
            .with_join_credential(JoinCredential {
                token: "SWMTKN-1-abc".to_string(),
                address: "10.0.0.1".to_string(),
            });

        DockerSwarmAction.execute(&mut ctx).await.unwrap();
        assert_eq!(
            mocks.remote.commands_for("10.0.0.2"),
            vec!["docker swarm join --token 'SWMTKN-1-abc' '10.0.0.1'"]
        );
    }

    #[tokio::test]
    async fn test_worker_without_credential_fails() {
        let mocks = MockServices::new();
        let mut ctx = target_context(&mocks, "10.0.0.2", "node-2").with_cluster(true);

        let err = DockerSwarmAction.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::Cluster(_)));
        assert_eq!(mocks.remote.connect_count("10.0.0.2"), 0);
    }
}
