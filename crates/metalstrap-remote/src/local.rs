//! Scripts executed on the controller

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{RemoteError, Result};
use crate::session::CommandOutput;

/// Runs shell scripts on the machine driving the bootstrap
#[async_trait]
pub trait LocalShell: Send + Sync {
    /// Run `script`, failing on a non-zero exit status
    async fn run(&self, script: &str) -> Result<CommandOutput>;
}

/// `sh -c` based [`LocalShell`]
#[derive(Debug, Clone, Default)]
pub struct SystemShell;

#[async_trait]
impl LocalShell for SystemShell {
    async fn run(&self, script: &str) -> Result<CommandOutput> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RemoteError::Spawn {
                program: "sh".to_string(),
                source,
            })?;

        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        if !output.success() {
            return Err(RemoteError::CommandFailed {
                command: script.to_string(),
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}
