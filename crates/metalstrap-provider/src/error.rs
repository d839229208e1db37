//! Error types for provider operations

use thiserror::Error;

/// Error type for provisioning API and discovery calls
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("api returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The API answered successfully but the body was not what we expected
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Api {
            status: 409,
            body: "BOOT_ALREADY_ENABLED".to_string(),
        };
        assert_eq!(err.to_string(), "api returned 409: BOOT_ALREADY_ENABLED");

        let err = ProviderError::UnexpectedResponse("no password".to_string());
        assert_eq!(err.to_string(), "unexpected response: no password");
    }
}
