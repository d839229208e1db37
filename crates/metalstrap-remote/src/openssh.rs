//! OpenSSH client transport
//!
//! Drives the system `ssh` binary. Password logins (the rescue system only
//! offers a one-time root password) go through `sshpass -e`, which reads the
//! password from `SSHPASS` so it never shows up in the process list.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{RemoteError, Result};
use crate::session::{CommandOutput, Endpoint, RemoteExecutor, RemoteSession};
use crate::shell_quote;

/// ssh exits with 255 when it failed itself rather than the remote command
const SSH_ERROR_STATUS: i32 = 255;

/// sshpass exit statuses that mean the login never happened
const SSHPASS_BAD_PASSWORD: i32 = 5;
const SSHPASS_HOST_KEY_UNKNOWN: i32 = 6;
const SSHPASS_HOST_KEY_CHANGED: i32 = 7;

const HOST_KEY_MARKERS: &[&str] = &[
    "REMOTE HOST IDENTIFICATION HAS CHANGED",
    "Host key verification failed",
];

/// OpenSSH based [`RemoteExecutor`]
#[derive(Debug, Clone)]
pub struct OpensshExecutor {
    ssh_program: String,
    sshpass_program: String,
    port: u16,
    connect_timeout: Duration,
    identity_file: Option<PathBuf>,
    known_hosts_file: Option<PathBuf>,
}

impl Default for OpensshExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl OpensshExecutor {
    pub fn new() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            sshpass_program: "sshpass".to_string(),
            port: 22,
            connect_timeout: Duration::from_secs(10),
            identity_file: None,
            known_hosts_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Use a specific private key instead of the agent/default identities
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Use a `known_hosts` file other than `~/.ssh/known_hosts`
    pub fn with_known_hosts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_file = Some(path.into());
        self
    }

    /// Command-line arguments passed to `ssh` for `endpoint`
    fn ssh_args(&self, endpoint: &Endpoint) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-p".to_string(),
            self.port.to_string(),
        ];
        if endpoint.password.is_none() {
            args.push("-o".to_string());
            args.push("BatchMode=yes".to_string());
        }
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        if let Some(known_hosts) = &self.known_hosts_file {
            args.push("-o".to_string());
            args.push(format!("UserKnownHostsFile={}", known_hosts.display()));
        }
        args.push(format!("{}@{}", endpoint.login, endpoint.address));
        args
    }

    fn command(&self, endpoint: &Endpoint, remote_command: &str) -> Command {
        let mut cmd = match &endpoint.password {
            Some(password) => {
                let mut cmd = Command::new(&self.sshpass_program);
                cmd.arg("-e").arg(&self.ssh_program).env("SSHPASS", password);
                cmd
            }
            None => Command::new(&self.ssh_program),
        };
        cmd.args(self.ssh_args(endpoint))
            .arg(remote_command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn program(&self, endpoint: &Endpoint) -> &str {
        if endpoint.password.is_some() {
            &self.sshpass_program
        } else {
            &self.ssh_program
        }
    }
}

#[async_trait]
impl RemoteExecutor for OpensshExecutor {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn RemoteSession>> {
        debug!(endpoint = %endpoint, "Opening ssh session");
        let session = OpensshSession {
            executor: self.clone(),
            endpoint: endpoint.clone(),
        };
        // Log in once so key and credential problems surface here
        session.exec("true").await?;
        Ok(Box::new(session))
    }
}

/// Session on one host through the OpenSSH client
#[derive(Debug)]
pub struct OpensshSession {
    executor: OpensshExecutor,
    endpoint: Endpoint,
}

impl OpensshSession {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteSession for OpensshSession {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let output = self
            .executor
            .command(&self.endpoint, command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RemoteError::Spawn {
                program: self.executor.program(&self.endpoint).to_string(),
                source,
            })?;

        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        classify(
            &self.endpoint.address,
            self.endpoint.password.is_some(),
            output,
        )
    }

    async fn put_file(&self, path: &str, content: &str) -> Result<()> {
        let command = format!("cat > {}", shell_quote(path));
        let mut child = self
            .executor
            .command(&self.endpoint, &command)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| RemoteError::Spawn {
                program: self.executor.program(&self.endpoint).to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        let output = classify(
            &self.endpoint.address,
            self.endpoint.password.is_some(),
            output,
        )?;
        if !output.success() {
            return Err(RemoteError::CommandFailed {
                command,
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Separate client-side failures from the remote command's own status
fn classify(host: &str, via_sshpass: bool, output: CommandOutput) -> Result<CommandOutput> {
    if HOST_KEY_MARKERS
        .iter()
        .any(|marker| output.stderr.contains(marker))
    {
        return Err(RemoteError::HostKeyMismatch {
            host: host.to_string(),
        });
    }

    if via_sshpass {
        match output.exit_code {
            SSHPASS_HOST_KEY_UNKNOWN | SSHPASS_HOST_KEY_CHANGED => {
                return Err(RemoteError::HostKeyMismatch {
                    host: host.to_string(),
                });
            }
            SSHPASS_BAD_PASSWORD => {
                return Err(RemoteError::ConnectionFailed {
                    host: host.to_string(),
                    message: "password rejected".to_string(),
                });
            }
            _ => {}
        }
    }

    if output.exit_code == SSH_ERROR_STATUS {
        return Err(RemoteError::ConnectionFailed {
            host: host.to_string(),
            message: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}
