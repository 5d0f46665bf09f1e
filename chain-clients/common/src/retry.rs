//! Retry and timeout policy for RPC calls.
//!
//! Only reads go through here. Transaction submissions are neither retried
//! nor cut off, so a slow confirmation cannot turn into a double submission.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

// ============================================================================
// POLICY
// ============================================================================

/// How many times a call is retried, how long to wait between attempts, and
/// how long a single attempt may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 means a single attempt)
    pub max_retries: u32,
    /// Pause between two attempts
    pub retry_delay: Duration,
    /// Upper bound for one attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Builds a policy from the millisecond values used in configuration files.
    pub fn from_millis(max_retries: u32, retry_delay_ms: u64, timeout_ms: u64) -> Self {
        Self {
            max_retries,
            retry_delay: Duration::from_millis(retry_delay_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Total number of attempts allowed by this policy.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(3, 2_000, 30_000)
    }
}

/// Failure of a call executed under a [`RetryPolicy`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("timed out after {timeout:?} (attempt {attempts})")]
    TimedOut { attempts: u32, timeout: Duration },

    #[error("failed after {attempts} attempt(s): {error}")]
    Failed { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::TimedOut { attempts, .. } | RetryError::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// # Arguments
///
/// * `policy` - Retry count, delay and per-attempt timeout
/// * `label` - Name of the call, used in log lines
/// * `op` - Produces a fresh future for every attempt
///
/// # Returns
///
/// * `Ok(T)` - Value of the first successful attempt
/// * `Err(RetryError)` - Outcome of the last attempt
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let allowed = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => RetryError::Failed {
                attempts: attempt,
                error,
            },
            Err(_) => RetryError::TimedOut {
                attempts: attempt,
                timeout: policy.timeout,
            },
        };

        if attempt >= allowed {
            return Err(error);
        }

        warn!(
            "{} failed (attempt {}/{}): {}; retrying in {:?}",
            label, attempt, allowed, error, policy.retry_delay
        );
        tokio::time::sleep(policy.retry_delay).await;
    }
}
