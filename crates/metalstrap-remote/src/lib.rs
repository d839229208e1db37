//! Metalstrap remote execution
//!
//! The transport a bootstrap run uses to reach its hosts, and the local
//! side effects that come with it:
//!
//! - [`RemoteExecutor`] / [`RemoteSession`]: open a login session on a host,
//!   run commands and upload files.
//! - [`KnownHosts`]: forget and re-record host keys in the controller's
//!   `known_hosts` file.
//! - [`LocalShell`]: run a script on the controller itself.
//!
//! The default implementations drive the system OpenSSH client
//! ([`OpensshExecutor`], [`OpensshKnownHosts`]) and `sh` ([`SystemShell`]).

pub mod error;
pub mod known_hosts;
pub mod local;
pub mod openssh;
pub mod session;

pub use error::{RemoteError, Result};
pub use known_hosts::{KnownHosts, OpensshKnownHosts};
pub use local::{LocalShell, SystemShell};
pub use openssh::{OpensshExecutor, OpensshSession};
pub use session::{CommandOutput, Endpoint, RemoteExecutor, RemoteSession};

/// Quote a string for use as a single POSIX shell word
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/cloud-config.yaml"), "'/tmp/cloud-config.yaml'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
