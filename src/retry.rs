//! Timeout, retry and backoff loop shared by every request path.
//!
//! The loop is generic over the operation so the policy does not depend on
//! a particular transport.

use std::{fmt, future::Future, time::Duration};

use tokio::time::{sleep, timeout};

use crate::{AttemptError, RetryConfig};

/// One invocation of the operation inside [`retry_with_timeout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// Zero-based attempt index; `0` is the initial attempt.
    pub index: u32,
    /// Time the attempt is allowed to run before it is cancelled.
    pub timeout: Duration,
}

impl Attempt {
    /// Returns true if no retry follows this attempt.
    pub fn is_last(&self, config: &RetryConfig) -> bool {
        self.index >= config.max_retries
    }
}

/// Runs `operation` until it succeeds or `1 + max_retries` attempts fail.
///
/// Each attempt is raced against its own timer. When the timer wins the
/// attempt's future is dropped, which cancels whatever it had in flight.
/// After failed attempt `i` the loop sleeps for
/// [`RetryConfig::backoff_delay`]`(i)` before starting attempt `i + 1`.
///
/// On exhaustion only the last attempt's error is returned. The config is
/// not validated here; callers resolve it first.
pub async fn retry_with_timeout<T, E, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, AttemptError<E>>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut index = 0u32;
    loop {
        let attempt = Attempt {
            index,
            timeout: config.timeout(),
        };

        let err = match timeout(attempt.timeout, operation(attempt)).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => AttemptError::Failed(err),
            Err(_elapsed) => AttemptError::Timeout {
                timeout_ms: config.timeout_ms,
            },
        };

        if attempt.is_last(config) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                attempts = index + 1,
                error = %err,
                "request failed, retries exhausted"
            );
            return Err(err);
        }

        wait_before_retry(config, index, &err).await;
        index += 1;
    }
}

async fn wait_before_retry<E: fmt::Display>(
    config: &RetryConfig,
    attempt: u32,
    err: &AttemptError<E>,
) {
    let delay = config.backoff_delay(attempt);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        attempt,
        error = %err,
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        "attempt failed, retrying"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = err;

    sleep(delay).await;
}
