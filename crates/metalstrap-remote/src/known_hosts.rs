//! Controller-side `known_hosts` maintenance

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{RemoteError, Result};

/// Host key bookkeeping on the controller
#[async_trait]
pub trait KnownHosts: Send + Sync {
    /// Drop every recorded key for `host`; forgetting an unknown host is fine
    async fn forget(&self, host: &str) -> Result<()>;

    /// Record the key `host` currently presents, replacing any stale one
    async fn remember(&self, host: &str) -> Result<()>;
}

/// `ssh-keygen`/`ssh-keyscan` based [`KnownHosts`]
#[derive(Debug, Clone)]
pub struct OpensshKnownHosts {
    file: Option<PathBuf>,
    port: u16,
}

impl Default for OpensshKnownHosts {
    fn default() -> Self {
        Self::new()
    }
}

impl OpensshKnownHosts {
    /// Maintain the current user's `~/.ssh/known_hosts`
    pub fn new() -> Self {
        Self {
            file: None,
            port: 22,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    fn known_hosts_path(&self) -> Result<PathBuf> {
        match &self.file {
            Some(file) => Ok(file.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".ssh").join("known_hosts"))
                .ok_or_else(|| {
                    RemoteError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "cannot determine home directory for known_hosts",
                    ))
                }),
        }
    }
}

#[async_trait]
impl KnownHosts for OpensshKnownHosts {
    async fn forget(&self, host: &str) -> Result<()> {
        let path = self.known_hosts_path()?;
        let output = Command::new("ssh-keygen")
            .arg("-R")
            .arg(host)
            .arg("-f")
            .arg(&path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RemoteError::Spawn {
                program: "ssh-keygen".to_string(),
                source,
            })?;

        // ssh-keygen fails when the file does not exist yet; nothing to forget then
        if !output.status.success() {
            debug!(
                host,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "ssh-keygen -R reported nothing to remove"
            );
        }
        Ok(())
    }

    async fn remember(&self, host: &str) -> Result<()> {
        self.forget(host).await?;

        let output = Command::new("ssh-keyscan")
            .arg("-p")
            .arg(self.port.to_string())
            .arg(host)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RemoteError::Spawn {
                program: "ssh-keyscan".to_string(),
                source,
            })?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(RemoteError::CommandFailed {
                command: format!("ssh-keyscan -p {} {}", self.port, host),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let path = self.known_hosts_path()?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&output.stdout).await?;
        file.flush().await?;

        debug!(host, path = %path.display(), "Recorded host key");
        Ok(())
    }
}
