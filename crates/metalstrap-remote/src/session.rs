//! Remote execution traits
//!
//! A session is opened per action and released when it is dropped, so an
//! action that bails out early with `?` still gives its session back.

use async_trait::async_trait;
use std::fmt;

use crate::error::{RemoteError, Result};

/// Where and as whom to log in
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host address (IP or resolvable name)
    pub address: String,
    /// Login name
    pub login: String,
    /// Password, when password authentication is wanted
    pub password: Option<String>,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            login: login.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.login, self.address)
    }
}

/// Captured output of a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// A successful command that printed `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Opens sessions on hosts
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Log in to `endpoint`
    ///
    /// A changed host key is reported as [`RemoteError::HostKeyMismatch`];
    /// every other failure as a different variant.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn RemoteSession>>;
}

/// A login session on one host
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Run a command, returning its output whatever the exit status
    async fn exec(&self, command: &str) -> Result<CommandOutput>;

    /// Write `content` to `path` on the host
    async fn put_file(&self, path: &str, content: &str) -> Result<()>;

    /// Run a command and fail unless it exits with status 0
    async fn exec_checked(&self, command: &str) -> Result<String> {
        let output = self.exec(command).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(RemoteError::CommandFailed {
                command: command.to_string(),
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}
