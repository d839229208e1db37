//! Rescue system activation

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::TargetContext;
use crate::error::Result;
use crate::kind::ActionKind;
use crate::outcome::Outcome;
use crate::traits::Action;

/// Activates the rescue system and keeps its one-time password
///
/// Every failed attempt deactivates the rescue system again before the
/// next one, so a half-activated host never lingers. Each attempt asks for
/// a fresh password.
pub struct EnableRescueModeAction;

#[async_trait]
impl Action for EnableRescueModeAction {
    fn kind(&self) -> ActionKind {
        ActionKind::EnableRescueMode
    }

    fn description(&self) -> &str {
        "Activate the provider's rescue system"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let provider = ctx.services.provider.clone();
        let policy = ctx.settings.retry.clone();
        let address = ctx.target.address().to_string();
        let os = ctx.target.config.rescue_os.clone();
        let bits = ctx.target.config.rescue_os_bit;

        info!(host = %address, os = %os, bits, "Enabling rescue mode");
        let activation = policy
            .run_with_cleanup(
                &mut ctx.target.retries,
                self.kind().as_str(),
                || {
                    let provider = provider.clone();
                    let address = address.clone();
                    let os = os.clone();
                    async move {
                        match provider.activate_rescue(&address, &os, bits).await {
                            Ok(activation) => Outcome::Success(activation),
                            Err(err) => Outcome::Retryable(err.to_string()),
                        }
                    }
                },
                |retry| {
                    let provider = provider.clone();
                    let address = address.clone();
                    async move {
                        if let Err(err) = provider.deactivate_rescue(&address).await {
                            warn!(host = %address, retry, error = %err, "Could not deactivate rescue mode");
                        }
                    }
                },
            )
            .await?;

        ctx.target.password = Some(activation.password);
        Ok(())
    }
}
