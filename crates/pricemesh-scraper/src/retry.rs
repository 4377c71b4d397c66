//! Retry with exponential back-off and jitter around one source's
//! fetch-and-extract unit.
//!
//! The gateway itself never retries: a failed race is ambiguous between
//! "blocked" and "transient", so the source client decides. Non-retriable
//! errors (a search URL that cannot be built, a transport that cannot be
//! constructed) stop immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Upper bound for a single back-off sleep.
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Returns `true` for errors worth another attempt after a back-off delay.
///
/// **Retriable:**
/// - [`ScraperError::Fetch`]: every transport failed or the fetch timed out.
/// - [`ScraperError::ExtractionEmpty`]: often a soft block or rate-limit
///   page rather than a genuine zero-result search.
///
/// **Not retriable:**
/// - [`ScraperError::InvalidSearchUrl`]: the URL will not change.
/// - [`ScraperError::Transport`]: configuration problem.
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    matches!(err, ScraperError::Fetch(_) | ScraperError::ExtractionEmpty { .. })
}

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later one.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Final result: the first success, or the error of the last attempt.
    pub result: Result<T, ScraperError>,
    /// Attempts that actually ran.
    pub attempts: u32,
    /// Errors of every failed attempt, oldest first.
    pub failures: Vec<ScraperError>,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Un-jittered delay after failed attempt number `attempt` (1-based).
    ///
    /// | Failed attempt | Delay before next        |
    /// |----------------|--------------------------|
    /// | 1              | `backoff_base × 2⁰`      |
    /// | 2              | `backoff_base × 2¹`      |
    /// | 3              | `backoff_base × 2²`      |
    ///
    /// Capped at 10 s.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(factor).min(MAX_DELAY)
    }

    /// Runs `operation` until it succeeds, fails with a non-retriable error,
    /// or `max_attempts` is reached. The closure receives the 1-based
    /// attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut failures = Vec::new();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                        failures,
                    }
                }
                Err(err) => {
                    if !is_retriable(&err) || attempt >= self.max_attempts {
                        return RetryOutcome {
                            result: Err(err),
                            attempts: attempt,
                            failures,
                        };
                    }

                    #[allow(
                        clippy::cast_possible_truncation,
                        clippy::cast_sign_loss,
                        clippy::cast_precision_loss
                    )]
                    let delay_ms = (self.base_delay(attempt).as_millis() as f64
                        * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                    tracing::warn!(
                        source = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms,
                        error = %err,
                        "source attempt failed, retrying after back-off"
                    );
                    failures.push(err);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}
