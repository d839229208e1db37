//! Post-install verification

use async_trait::async_trait;
use tracing::info;

use crate::context::TargetContext;
use crate::error::{ActionError, Result};
use crate::kind::ActionKind;
use crate::traits::Action;

/// Reads the hostname of the installed system
pub const HOSTNAME_COMMAND: &str = "cat /etc/hostname";

/// Compare the configured hostname with what the host reports
pub fn check_hostname(expected: &str, observed: &str) -> Result<()> {
    let observed = observed.trim_end_matches(['\r', '\n']);
    if expected == observed {
        Ok(())
    } else {
        Err(ActionError::Verification {
            expected: expected.to_string(),
            observed: observed.to_string(),
        })
    }
}

/// Logs in to the installed system and checks its hostname
///
/// From here on the target uses the post-install login and no longer offers
/// the rescue password.
pub struct VerifyInstallationAction;

#[async_trait]
impl Action for VerifyInstallationAction {
    fn kind(&self) -> ActionKind {
        ActionKind::VerifyInstallation
    }

    fn description(&self) -> &str {
        "Verify the installed system"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        info!(host = %ctx.address(), "Verifying the installation ...");
        ctx.target.login = ctx.settings.post_install_login.clone();
        ctx.target.installed = true;

        let session = ctx.services.remote.connect(&ctx.endpoint()).await?;
        let observed = session.exec_checked(HOSTNAME_COMMAND).await?;
        check_hostname(ctx.target.hostname(), &observed)?;

        info!(host = %ctx.address(), "The installation has been successful");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{target_context, MockServices};

    #[test]
    fn test_check_hostname() {
        assert!(check_hostname("node-1", "node-1").is_ok());
        assert!(check_hostname("node-1", "node-1\n").is_ok());

        let err = check_hostname("node-1", "node-2").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("node-1"));
        assert!(message.contains("node-2"));
        assert_eq!(err.kind(), crate::ErrorKind::Verification);
    }

    #[tokio::test]
    async fn test_verify_switches_login() {
        let mocks = MockServices::new();
        mocks.remote.set_hostname("10.0.0.1", "node-1");
        let mut ctx = target_context(&mocks, "10.0.0.1", "node-1");
        ctx.target.password = Some("rescue".to_string());

        VerifyInstallationAction.execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.target.login, "core");
        assert!(ctx.target.installed);
        let endpoint = mocks.remote.last_endpoint("10.0.0.1").unwrap();
        assert_eq!(endpoint.login, "core");
        assert!(endpoint.password.is_none());
    }

    #[tokio::test]
    async fn test_verify_hostname_mismatch() {
        let mocks = MockServices::new();
        mocks.remote.set_hostname("10.0.0.1", "node-2");
        let mut ctx = target_context(&mocks, "10.0.0.1", "node-1");

        let err = VerifyInstallationAction.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ActionError::Verification { ref expected, ref observed }
                if expected == "node-1" && observed == "node-2"
        ));
    }
}
