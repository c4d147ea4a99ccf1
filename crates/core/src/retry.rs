//! Deadline-bounded retry helpers
//!
//! The SDK already retries transport failures internally. These helpers
//! cover the service-level conditions that need a longer wait, such as a
//! bucket that is not yet visible right after creation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

/// Deadline for [`retry_on_code`]
pub const RETRY_ON_CODE_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Initial pause between attempts
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound for the pause between attempts
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Outcome of a single failed attempt
#[derive(Debug)]
pub enum RetryError {
    /// Try again while the deadline allows it
    Retryable(Error),
    /// Stop immediately and surface the error
    NonRetryable(Error),
}

impl RetryError {
    pub fn retryable(err: Error) -> Self {
        RetryError::Retryable(err)
    }

    pub fn non_retryable(err: Error) -> Self {
        RetryError::NonRetryable(err)
    }
}

/// Run `op` until it succeeds, fails non-retryably, or `timeout` elapses.
///
/// Each attempt is itself bounded by the remaining time. When the deadline
/// passes, the returned [`Error::Timeout`] remembers the last retryable
/// error; it is `None` only when no attempt completed with an error, which
/// [`Error::is_resource_timeout`] reports.
pub async fn retry_until<T, F, Fut>(timeout: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RetryError>>,
{
    let deadline = Instant::now() + timeout;
    let mut backoff = INITIAL_BACKOFF;
    let mut last_error: Option<Error> = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout {
                last_error: last_error.map(Box::new),
            });
        }

        match tokio::time::timeout(remaining, op()).await {
            Err(_elapsed) => {
                return Err(Error::Timeout {
                    last_error: last_error.map(Box::new),
                });
            }
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(RetryError::NonRetryable(err))) => return Err(err),
            Ok(Err(RetryError::Retryable(err))) => {
                tracing::debug!("retryable error, waiting {:?}: {}", backoff, err);
                last_error = Some(err);
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(backoff.min(remaining)).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Run `op` under a fixed two minute deadline, retrying only while it
/// fails with the API error code `code`. Any other error fails immediately.
pub async fn retry_on_code<T, F, Fut>(code: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_until(RETRY_ON_CODE_TIMEOUT, || {
        let attempt = op();
        async move {
            attempt.await.map_err(|err| {
                if crate::classify::error_code(&err) == Some(code) {
                    RetryError::Retryable(err)
                } else {
                    RetryError::NonRetryable(err)
                }
            })
        }
    })
    .await
}
