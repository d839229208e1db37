//! Reboot detection

use async_trait::async_trait;
use tracing::info;

use crate::context::TargetContext;
use crate::error::Result;
use crate::kind::ActionKind;
use crate::traits::Action;
use crate::wait::{wait_for_down, wait_for_up};

/// Waits for SSH to go away, meaning the reboot has begun
pub struct WaitForSshDownAction;

#[async_trait]
impl Action for WaitForSshDownAction {
    fn kind(&self) -> ActionKind {
        ActionKind::WaitForSshDown
    }

    fn description(&self) -> &str {
        "Wait until SSH stops answering"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let address = ctx.address();
        info!(host = %address, "Waiting for SSH to go down");
        let probes = wait_for_down(ctx.services.prober.as_ref(), address, &ctx.settings.wait).await;
        info!(host = %address, probes, "SSH is down");
        Ok(())
    }
}

/// Waits for SSH to answer again
pub struct WaitForSshUpAction;

#[async_trait]
impl Action for WaitForSshUpAction {
    fn kind(&self) -> ActionKind {
        ActionKind::WaitForSshUp
    }

    fn description(&self) -> &str {
        "Wait until SSH answers again"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let address = ctx.address();
        info!(host = %address, "Waiting for SSH to come up");
        let probes = wait_for_up(ctx.services.prober.as_ref(), address, &ctx.settings.wait).await;
        info!(host = %address, probes, "SSH is up");
        Ok(())
    }
}
