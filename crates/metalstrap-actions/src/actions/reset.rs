//! Hardware reset through the provider

use async_trait::async_trait;
use tracing::info;

use crate::context::TargetContext;
use crate::error::Result;
use crate::kind::ActionKind;
use crate::outcome::Outcome;
use crate::traits::Action;

/// Resets the host so it boots the rescue system
pub struct ResetAction;

#[async_trait]
impl Action for ResetAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Reset
    }

    fn description(&self) -> &str {
        "Reset the host through the provider"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let provider = ctx.services.provider.clone();
        let policy = ctx.settings.retry.clone();
        let mode = ctx.settings.reset_mode;
        let address = ctx.target.address().to_string();

        info!(host = %address, mode = %mode, "Resetting");
        policy
            .run(&mut ctx.target.retries, self.kind().as_str(), || {
                let provider = provider.clone();
                let address = address.clone();
                async move {
                    match provider.hard_reset(&address, mode).await {
                        Ok(()) => Outcome::Success(()),
                        Err(err) => Outcome::Retryable(err.to_string()),
                    }
                }
            })
            .await
    }
}
