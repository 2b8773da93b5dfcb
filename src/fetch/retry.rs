//! Bounded exponential-backoff retry around fetch attempts.
//!
//! Only transiently-classified failures (timeout, connection establishment)
//! are retried; permanent failures surface immediately after a single
//! attempt. With a budget of `R` retries the wrapped operation makes at most
//! `R + 1` attempts, then fails with a terminal [`FetchError`] naming the
//! URL, the attempt count, and the last underlying failure.

use crate::fetch::client::{FetchAttemptError, FetchClient, FetchError};
use crate::models::record::MetadataRecord;
use std::time::Duration;

/// Retry budget and backoff bounds for one outer fetch call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt (`R`).
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub min_backoff: Duration,
    /// Upper bound on any single backoff delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Fetch `url`, retrying transient failures per `policy`.
pub async fn fetch_with_retry(
    client: &FetchClient,
    url: &str,
    policy: RetryPolicy,
) -> Result<MetadataRecord, FetchError> {
    retry_with_backoff(policy, url, || client.fetch(url)).await
}

/// Drive `attempt` until it succeeds, fails permanently, or the budget is
/// spent. Generic over the attempt future so the budget and backoff
/// behaviour can be exercised without a network.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    url: &str,
    mut attempt: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchAttemptError>>,
{
    let total_attempts = policy.max_retries.saturating_add(1);
    let mut delay = policy.min_backoff;
    let mut attempt_no = 0u32;

    loop {
        attempt_no += 1;
        let reason = match attempt().await {
            Ok(value) => return Ok(value),
            Err(FetchAttemptError::Fatal(err)) => return Err(err),
            Err(FetchAttemptError::Transient { reason }) => reason,
        };

        if attempt_no >= total_attempts {
            return Err(FetchError::RetriesExhausted {
                url: url.to_string(),
                attempts: total_attempts,
                reason,
            });
        }

        tracing::warn!(
            url,
            attempt = attempt_no,
            of = total_attempts,
            delay_ms = delay.as_millis() as u64,
            %reason,
            "transient fetch failure, backing off"
        );
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(policy.max_backoff);
    }
}
