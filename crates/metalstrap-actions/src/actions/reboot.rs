//! Reboot action

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::TargetContext;
use crate::error::Result;
use crate::kind::ActionKind;
use crate::traits::Action;

/// Reboots the host into the freshly installed system
pub struct RebootAction;

#[async_trait]
impl Action for RebootAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Reboot
    }

    fn description(&self) -> &str {
        "Reboot the host"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        info!(host = %ctx.address(), "Rebooting ...");
        let session = ctx.services.remote.connect(&ctx.endpoint()).await?;

        // The connection may drop before the command returns
        if let Err(err) = session.exec("reboot").await {
            warn!(host = %ctx.address(), error = %err, "Connection lost while rebooting");
        }
        Ok(())
    }
}
