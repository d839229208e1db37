//! OS installation from the rescue system

use async_trait::async_trait;
use metalstrap_remote::shell_quote;
use tracing::info;

use crate::context::TargetContext;
use crate::error::Result;
use crate::kind::ActionKind;
use crate::settings::InstallSettings;
use crate::template;
use crate::traits::Action;

const INSTALLER: &str = "/tmp/coreos-install";
const TRANSPILER: &str = "/tmp/ct";

/// Commands that fetch the installer tooling and transpile the uploaded
/// configuration document, in order
pub fn install_commands(install: &InstallSettings) -> Vec<String> {
    vec![
        format!("wget -q -O {INSTALLER} {}", shell_quote(&install.installer_url)),
        format!("wget -q -O {TRANSPILER} {}", shell_quote(&install.transpiler_url)),
        format!("chmod a+x {INSTALLER}"),
        format!("chmod a+x {TRANSPILER}"),
        format!(
            "{TRANSPILER} < {} > {}",
            shell_quote(&install.config_path),
            shell_quote(&install.ignition_path)
        ),
    ]
}

/// Renders the configuration document and installs the OS with it
///
/// The document is rendered before the host is contacted, so a broken
/// template leaves the host untouched.
pub struct InstallImageAction;

#[async_trait]
impl Action for InstallImageAction {
    fn kind(&self) -> ActionKind {
        ActionKind::InstallImage
    }

    fn description(&self) -> &str {
        "Install the OS image from the rescue system"
    }

    async fn execute(&self, ctx: &mut TargetContext) -> Result<()> {
        let document = template::render(
            "cloud config",
            &ctx.target.config.cloud_config,
            &ctx.template_params(),
        )?;
        let install = &ctx.settings.install;

        let session = ctx.services.remote.connect(&ctx.endpoint()).await?;
        session.put_file(&install.config_path, &document).await?;
        for command in install_commands(install) {
            info!(host = %ctx.address(), "Remote executing: {}", command);
            session.exec_checked(&command).await?;
        }

        let bootstrap = ctx.target.bootstrap_cmd(&install.ignition_path);
        info!(host = %ctx.address(), "Remote executing: {}", bootstrap);
        let output = session.exec_checked(&bootstrap).await?;
        info!(host = %ctx.address(), "{}", output.trim_end());
        Ok(())
    }
}
