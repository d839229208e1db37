//! Tagged results of fallible remote operations
//!
//! Operations that can fail in an expected way return an [`Outcome`]
//! instead of an error, so the retry policy and the pipeline branch on the
//! tag rather than on which error type happened to be raised.

use crate::error::ActionError;

/// Result of one attempt at an operation
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation did what it was asked
    Success(T),
    /// The operation hit an expected condition and repaired it
    Recovered { value: T, note: String },
    /// The operation failed in a way worth trying again
    Retryable(String),
    /// The operation failed for good
    Terminal(ActionError),
}

impl<T> Outcome<T> {
    /// Collapse into a `Result`, treating `Retryable` as terminal
    pub fn into_result(self, operation: &str) -> crate::error::Result<T> {
        match self {
            Outcome::Success(value) | Outcome::Recovered { value, .. } => Ok(value),
            Outcome::Retryable(last) => Err(ActionError::Provisioning {
                operation: operation.to_string(),
                attempts: 1,
                last,
            }),
            Outcome::Terminal(err) => Err(err),
        }
    }
}
