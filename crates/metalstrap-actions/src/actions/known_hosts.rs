//! Local known_hosts maintenance

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::TargetContext;
use crate::error::{ActionError, Result};
use crate::events::PipelineEvent;
use crate::kind::ActionKind;
use crate::outcome::Outcome;
use crate::traits::Action;

/// Drops the host's entries, by address and by hostname
///
/// Idempotent: a host with no entries is fine.
pub struct RemoveFromKnownHostsAction;

#[async_trait]
impl Action for RemoveFromKnownHostsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RemoveFromLocalKnownHosts
    }

    fn description(&self) -> &str {
        "Remove the host's keys from the local known_hosts file"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let known_hosts = &ctx.services.known_hosts;
        for name in [ctx.target.hostname(), ctx.target.address()] {
            known_hosts
                .forget(name)
                .await
                .map_err(ActionError::LocalCommand)?;
        }
        Ok(())
    }
}

/// Logs in once so a changed host key gets noticed and recorded
///
/// The host comes back from every reboot with a different key, so a
/// mismatch here is expected: the stale key is replaced and the login
/// retried once.
pub struct UpdateKnownHostsAction;

impl UpdateKnownHostsAction {
    async fn refresh(&self, ctx: &TargetContext) -> Outcome<()> {
        let endpoint = ctx.endpoint();
        let err = match ctx.services.remote.connect(&endpoint).await {
            Ok(_session) => return Outcome::Success(()),
            Err(err) if err.is_host_key_mismatch() => err,
            Err(err) => return Outcome::Terminal(err.into()),
        };
        warn!(host = %endpoint.address, error = %err, "Host key changed");

        let address = ctx.address();
        if let Err(err) = ctx.services.known_hosts.remember(address).await {
            return Outcome::Terminal(ActionError::LocalCommand(err));
        }
        match ctx.services.remote.connect(&endpoint).await {
            Ok(_session) => Outcome::Recovered {
                value: (),
                note: format!("recorded new host key for {address}"),
            },
            Err(err) => Outcome::Terminal(err.into()),
        }
    }
}

#[async_trait]
impl Action for UpdateKnownHostsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::UpdateLocalKnownHosts
    }

    fn description(&self) -> &str {
        "Record the host's current key in the local known_hosts file"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        match self.refresh(ctx).await {
            Outcome::Success(()) => Ok(()),
            Outcome::Recovered { note, .. } => {
                info!(host = %ctx.address(), "Remote host key has been added to local known_hosts file");
                ctx.report(PipelineEvent::recovered(ctx.address(), self.kind(), note));
                Ok(())
            }
            other => other.into_result(self.kind().as_str()),
        }
    }
}
