//! First-of-N combinator: run labelled attempts concurrently, keep the first
//! success, abort the rest.

use std::future::Future;

use tokio::task::JoinSet;
use tokio::time::Instant;

/// Every attempt failed, or the deadline passed first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RaceLost {
    pub(crate) timed_out: bool,
    /// `"label: reason"` per attempt that finished, in completion order.
    pub(crate) failures: Vec<String>,
}

impl RaceLost {
    pub(crate) fn summary(&self) -> String {
        if self.failures.is_empty() {
            "no transport finished".to_string()
        } else {
            self.failures.join("; ")
        }
    }
}

/// Returns the first `Ok` produced before `deadline`, along with the label of
/// the attempt that produced it. Losing attempts are aborted on return; the
/// underlying requests may still complete in the background.
pub(crate) async fn first_ok<T, F>(
    attempts: Vec<(&'static str, F)>,
    deadline: Instant,
) -> Result<(&'static str, T), RaceLost>
where
    T: Send + 'static,
    F: Future<Output = Result<T, String>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for (label, attempt) in attempts {
        set.spawn(async move { (label, attempt.await) });
    }

    let mut failures = Vec::new();
    loop {
        match tokio::time::timeout_at(deadline, set.join_next()).await {
            Err(_) => {
                set.abort_all();
                return Err(RaceLost {
                    timed_out: true,
                    failures,
                });
            }
            Ok(None) => {
                return Err(RaceLost {
                    timed_out: false,
                    failures,
                })
            }
            Ok(Some(Ok((label, Ok(value))))) => {
                set.abort_all();
                return Ok((label, value));
            }
            Ok(Some(Ok((label, Err(reason))))) => {
                tracing::debug!(transport = label, reason = %reason, "transport lost the race");
                failures.push(format!("{label}: {reason}"));
            }
            Ok(Some(Err(join_err))) => {
                failures.push(format!("task: {join_err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::time::Duration;

    use super::*;

    type Attempt = Pin<Box<dyn Future<Output = Result<u32, String>> + Send>>;

    fn after(ms: u64, result: Result<u32, String>) -> Attempt {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            result
        })
    }

    fn deadline(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[tokio::test]
    async fn fastest_success_wins() {
        let result = first_ok(
            vec![("slow", after(300, Ok(1))), ("fast", after(10, Ok(2)))],
            deadline(1_000),
        )
        .await;
        assert_eq!(result, Ok(("fast", 2)));
    }

    #[tokio::test]
    async fn failure_does_not_end_the_race() {
        let result = first_ok(
            vec![
                ("broken", after(5, Err("HTTP 503".into()))),
                ("ok", after(50, Ok(7))),
            ],
            deadline(1_000),
        )
        .await;
        assert_eq!(result, Ok(("ok", 7)));
    }

    #[tokio::test]
    async fn all_failures_are_summarised() {
        let lost = first_ok(
            vec![
                ("a", after(5, Err("HTTP 403".into()))),
                ("b", after(80, Err("bot challenge page".into()))),
            ],
            deadline(1_000),
        )
        .await
        .unwrap_err();
        assert!(!lost.timed_out);
        assert_eq!(lost.summary(), "a: HTTP 403; b: bot challenge page");
    }

    #[tokio::test]
    async fn deadline_stops_waiting() {
        let lost = first_ok(
            vec![("hung", after(60_000, Ok(1))), ("bad", after(5, Err("HTTP 500".into())))],
            deadline(100),
        )
        .await
        .unwrap_err();
        assert!(lost.timed_out);
        assert_eq!(lost.failures, vec!["bad: HTTP 500".to_string()]);
    }

    #[tokio::test]
    async fn no_attempts_loses_immediately() {
        let lost = first_ok(Vec::<(&'static str, Attempt)>::new(), deadline(100))
            .await
            .unwrap_err();
        assert!(!lost.timed_out);
        assert_eq!(lost.summary(), "no transport finished");
    }
}
