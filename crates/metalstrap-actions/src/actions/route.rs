//! Host-specific network route

use async_trait::async_trait;
use tracing::{debug, info};

use crate::context::TargetContext;
use crate::error::Result;
use crate::kind::ActionKind;
use crate::traits::Action;

/// Runs the host's route command on the host, if one is configured
pub struct ConfigureRouteAction;

#[async_trait]
impl Action for ConfigureRouteAction {
    fn kind(&self) -> ActionKind {
        ActionKind::ConfigureRoute
    }

    fn description(&self) -> &str {
        "Configure the host's network route"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let Some(route_cmd) = ctx.target.config.route_cmd.as_deref() else {
            debug!(host = %ctx.address(), "No route command");
            return Ok(());
        };

        let session = ctx.services.remote.connect(&ctx.endpoint()).await?;
        info!(host = %ctx.address(), "Remote executing: {}", route_cmd);
        let output = session.exec_checked(route_cmd).await?;
        info!(host = %ctx.address(), "{}", output.trim_end());
        Ok(())
    }
}
