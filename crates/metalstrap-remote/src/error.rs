//! Error types for remote execution

use thiserror::Error;

/// Error type for transport and local command failures
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The host presented a key different from the recorded one
    #[error("host key mismatch for {host}")]
    HostKeyMismatch { host: String },

    /// The session could not be established or was lost
    #[error("connection to {host} failed: {message}")]
    ConnectionFailed { host: String, message: String },

    /// A command ran but exited unsuccessfully
    #[error("command `{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// A helper program could not be started
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while talking to a child process or a local file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// Whether this is the recoverable host-key-changed condition
    pub fn is_host_key_mismatch(&self) -> bool {
        matches!(self, RemoteError::HostKeyMismatch { .. })
    }
}

/// Result type for remote operations
pub type Result<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RemoteError::HostKeyMismatch {
            host: "10.0.0.1".to_string(),
        };
        assert_eq!(err.to_string(), "host key mismatch for 10.0.0.1");
        assert!(err.is_host_key_mismatch());

        let err = RemoteError::CommandFailed {
            command: "chmod a+x /tmp/ct".to_string(),
            status: 1,
            stderr: "no such file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "command `chmod a+x /tmp/ct` exited with status 1: no such file"
        );
        assert!(!err.is_host_key_mismatch());
    }
}
