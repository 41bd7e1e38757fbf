//! Bounded-concurrency parallel fan-out over sub-agent calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::error::GatewayError;
use crate::metrics::Metrics;

/// Concurrency cap applied when a caller configures `max_concurrency <= 0`.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// A single unit of fan-out work: an agent label paired with an async call.
pub struct Call {
    /// Sub-agent name, used only for labeling `merge_results` errors.
    pub agent: String,
    /// The call itself, already closed over its client and query text.
    pub future: Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send>>,
}

impl Call {
    /// Wrap a future as a labeled fan-out call.
    pub fn new(
        agent: impl Into<String>,
        future: impl Future<Output = Result<String, GatewayError>> + Send + 'static,
    ) -> Self {
        Self {
            agent: agent.into(),
            future: Box::pin(future),
        }
    }
}

/// One slot of a parallel batch's result list, aligned to submission index.
pub struct CallResult {
    /// The sub-agent this slot belongs to.
    pub agent: String,
    /// The outcome of this call.
    pub outcome: Result<String, GatewayError>,
}

/// Execute `calls` with at most `max_concurrency` running at once (or
/// [`DEFAULT_MAX_CONCURRENCY`] when `max_concurrency` is `0`).
///
/// - 0 calls returns an empty list immediately.
/// - 1 call runs inline on the caller's task, no extra scheduling.
/// - N ≥ 2 calls spawn concurrently, bounded by a semaphore; results land at
///   `results[i]` for submission index `i`, regardless of completion order.
///
/// Errors in one call never cancel its peers.
pub async fn execute(calls: Vec<Call>) -> Vec<CallResult> {
    execute_bounded(calls, DEFAULT_MAX_CONCURRENCY).await
}

/// Like [`execute`], but with an explicit concurrency bound (`0` maps to
/// [`DEFAULT_MAX_CONCURRENCY`]).
pub async fn execute_bounded(calls: Vec<Call>, max_concurrency: usize) -> Vec<CallResult> {
    let started = Instant::now();
    let batch_size = calls.len();

    let results = match batch_size {
        0 => Vec::new(),
        1 => {
            let call = calls.into_iter().next().expect("len checked above");
            let agent = call.agent;
            let outcome = call.future.await;
            vec![CallResult { agent, outcome }]
        }
        _ => {
            let bound = if max_concurrency == 0 {
                DEFAULT_MAX_CONCURRENCY
            } else {
                max_concurrency
            };
            let semaphore = Arc::new(Semaphore::new(bound));
            let mut handles = Vec::with_capacity(batch_size);

            for call in calls {
                let permit = Arc::clone(&semaphore);
                handles.push(tokio::spawn(async move {
                    let _permit = permit.acquire_owned().await;
                    let agent = call.agent;
                    let outcome = call.future.await;
                    CallResult { agent, outcome }
                }));
            }

            let mut results = Vec::with_capacity(batch_size);
            for handle in handles {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(join_err) => results.push(CallResult {
                        agent: "unknown".to_string(),
                        outcome: Err(GatewayError::TransportFatal {
                            agent: "unknown".to_string(),
                            message: format!("task panicked: {join_err}"),
                        }),
                    }),
                }
            }
            results
        }
    };

    let successful_count = results.iter().filter(|r| r.outcome.is_ok()).count();
    Metrics::global().record_batch(batch_size, successful_count, started.elapsed());
    results
}

/// Like [`execute_bounded`], but cancels the whole batch at `deadline`. Every
/// slot still gets a result: either its real answer or a cancellation error.
pub async fn execute_with_timeout(
    calls: Vec<Call>,
    max_concurrency: usize,
    deadline: Duration,
) -> Vec<CallResult> {
    let agents: Vec<String> = calls.iter().map(|c| c.agent.clone()).collect();

    match timeout(deadline, execute_bounded(calls, max_concurrency)).await {
        Ok(results) => results,
        Err(_) => agents
            .into_iter()
            .map(|agent| CallResult {
                agent: agent.clone(),
                outcome: Err(GatewayError::CancelledOrDeadline { agent }),
            })
            .collect(),
    }
}

/// Whether any result in `results` is an error.
#[must_use]
pub fn has_errors(results: &[CallResult]) -> bool {
    results.iter().any(|r| r.outcome.is_err())
}

/// Whether every result in `results` succeeded.
#[must_use]
pub fn all_succeeded(results: &[CallResult]) -> bool {
    results.iter().all(|r| r.outcome.is_ok())
}

/// Split `results` into successful responses and `"<agent>: <err>"`-labeled
/// error strings.
#[must_use]
pub fn merge_results(results: Vec<CallResult>) -> (Vec<String>, Vec<String>) {
    let mut successes = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result.outcome {
            Ok(text) => successes.push(text),
            Err(err) => errors.push(format!("{}: {err}", result.agent)),
        }
    }
    (successes, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_calls_returns_empty() {
        let results = execute(Vec::new()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn single_call_runs_inline() {
        let results = execute(vec![Call::new("agent-a", async { Ok("hi".to_string()) })]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome.as_ref().unwrap(), "hi");
    }

    #[tokio::test]
    async fn preserves_submission_order_regardless_of_completion_order() {
        let calls = vec![
            Call::new("slow", async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok("slow-done".to_string())
            }),
            Call::new("fast", async { Ok("fast-done".to_string()) }),
        ];
        let results = execute(calls).await;
        assert_eq!(results[0].agent, "slow");
        assert_eq!(results[0].outcome.as_ref().unwrap(), "slow-done");
        assert_eq!(results[1].agent, "fast");
        assert_eq!(results[1].outcome.as_ref().unwrap(), "fast-done");
    }

    #[tokio::test]
    async fn one_failure_does_not_cancel_peers() {
        let calls = vec![
            Call::new("ok-agent", async { Ok("fine".to_string()) }),
            Call::new("bad-agent", async {
                Err(GatewayError::TransportFatal {
                    agent: "bad-agent".to_string(),
                    message: "boom".to_string(),
                })
            }),
        ];
        let results = execute(calls).await;
        assert!(results[0].outcome.is_ok());
        assert!(results[1].outcome.is_err());
    }

    #[test]
    fn merge_results_labels_errors_with_agent_name() {
        let results = vec![
            CallResult {
                agent: "a".to_string(),
                outcome: Ok("good".to_string()),
            },
            CallResult {
                agent: "b".to_string(),
                outcome: Err(GatewayError::TransportFatal {
                    agent: "b".to_string(),
                    message: "bad".to_string(),
                }),
            },
        ];
        let (successes, errors) = merge_results(results);
        assert_eq!(successes, vec!["good".to_string()]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("b: "));
    }

    #[tokio::test]
    async fn has_errors_and_all_succeeded_are_consistent() {
        let results = execute(vec![Call::new("a", async { Ok("x".to_string()) })]).await;
        assert!(!has_errors(&results));
        assert!(all_succeeded(&results));
    }
}
