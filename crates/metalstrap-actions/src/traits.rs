//! Action trait definition

use async_trait::async_trait;

use crate::context::TargetContext;
use crate::error::Result;
use crate::kind::ActionKind;

/// Handler for one pipeline step
///
/// Each [`ActionKind`] is bound to exactly one handler in the
/// [`ActionEngine`](crate::ActionEngine). Handlers mutate the target's state
/// through the context they are handed and nothing else.
///
/// # Example
///
/// ```ignore
/// use metalstrap_actions::{Action, ActionKind, Result, TargetContext};
/// use async_trait::async_trait;
///
/// struct Uptime;
///
/// #[async_trait]
/// impl Action for Uptime {
///     fn kind(&self) -> ActionKind {
///         ActionKind::VerifyInstallation
///     }
///
///     fn description(&self) -> &str {
///         "Print the host's uptime"
///     }
///
///     async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
///         let session = ctx.services.remote.connect(&ctx.endpoint()).await?;
///         session.exec_checked("uptime").await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync {
    /// The step this handler implements
    fn kind(&self) -> ActionKind;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Run the step for the context's target
    async fn execute(&self, ctx: &mut TargetContext) -> Result<()>;
}
