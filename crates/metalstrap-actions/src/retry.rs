//! Bounded retry with growing backoff
//!
//! The attempt counter lives on the target, not in the policy: it is reset
//! whenever an operation succeeds and keeps counting across the attempts of
//! one operation.

use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{ActionError, Result};
use crate::outcome::Outcome;

/// Retries after the first attempt before giving up
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry policy for flaky provider operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
    /// Length of one backoff time unit
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, unit: Duration) -> Self {
        Self { max_retries, unit }
    }

    /// Backoff before retry `attempt` in time units: `attempt² × 3 + 1`
    pub fn backoff_units(attempt: u32) -> u64 {
        let n = u64::from(attempt);
        n * n * 3 + 1
    }

    /// Backoff before retry `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.unit
            .saturating_mul(u32::try_from(Self::backoff_units(attempt)).unwrap_or(u32::MAX))
    }

    /// Run `op` until it succeeds, fails terminally or runs out of retries
    pub async fn run<T, Op, Fut>(&self, retries: &mut u32, operation: &str, op: Op) -> Result<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        self.run_with_cleanup(retries, operation, op, |_| async {})
            .await
    }

    /// Like [`run`](Self::run), calling `cleanup` before every retry
    ///
    /// `cleanup` receives the retry number about to be attempted.
    pub async fn run_with_cleanup<T, Op, Fut, Cleanup, CleanupFut>(
        &self,
        retries: &mut u32,
        operation: &str,
        mut op: Op,
        mut cleanup: Cleanup,
    ) -> Result<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T>>,
        Cleanup: FnMut(u32) -> CleanupFut,
        CleanupFut: Future<Output = ()>,
    {
        loop {
            match op().await {
                Outcome::Success(value) => {
                    *retries = 0;
                    return Ok(value);
                }
                Outcome::Recovered { value, note } => {
                    info!(operation, note = %note, "Recovered");
                    *retries = 0;
                    return Ok(value);
                }
                Outcome::Terminal(err) => return Err(err),
                Outcome::Retryable(last) => {
                    let attempts = *retries + 1;
                    if *retries >= self.max_retries {
                        error!(operation, attempts, error = %last, "Giving up");
                        return Err(ActionError::Provisioning {
                            operation: operation.to_string(),
                            attempts,
                            last,
                        });
                    }

                    *retries += 1;
                    let delay = self.backoff(*retries);
                    warn!(
                        operation,
                        retries = *retries,
                        error = %last,
                        backoff = ?delay,
                        "Problem while trying to {}, retrying",
                        operation
                    );
                    cleanup(*retries).await;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
