//! Sub-agent transports: a uniform `query(ctx, text) -> text | error`
//! capability over two wire protocols.

pub mod a2a;
pub mod rest;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

pub use a2a::A2aTransport;
pub use rest::RestTransport;

use crate::context::CallContext;
use crate::error::GatewayError;

/// Default response-size truncation threshold (100 KiB).
pub const TRUNCATION_LIMIT_BYTES: usize = 100 * 1024;
/// Marker appended to a response truncated at [`TRUNCATION_LIMIT_BYTES`].
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Truncate `text` to [`TRUNCATION_LIMIT_BYTES`] bytes (on a char boundary),
/// appending [`TRUNCATION_MARKER`] when truncation occurred.
#[must_use]
pub fn truncate_response(text: String) -> String {
    if text.len() <= TRUNCATION_LIMIT_BYTES {
        return text;
    }
    let mut cut = TRUNCATION_LIMIT_BYTES;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = text[..cut].to_string();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// A wire-protocol-specific way of reaching one sub-agent.
#[async_trait]
pub trait SubAgentTransport: Send + Sync {
    /// Send `text` to the remote agent under `ctx` and return its extracted
    /// text response.
    async fn query(&self, ctx: &CallContext, text: &str) -> Result<String, GatewayError>;

    /// Release any held resources (connections, background tasks). Errors
    /// are collected by the caller, not treated as fatal.
    async fn close(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Policy governing [`RetryTransport`]'s exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first), default 3.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Compute the delay before retry attempt number `attempt` (1-indexed:
    /// the delay before the *first* retry is attempt `1`), with ±25% jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(-0.25..=0.25);
        let jittered = (capped * (1.0 + jitter)).max(0.0);
        Duration::from_secs_f64(jittered)
    }
}

/// Whether `error` is retryable under the retry interceptor's policy: HTTP
/// 502/503/504/429, or any recoverable transport-level failure.
#[must_use]
pub fn is_retryable(error: &GatewayError) -> bool {
    match error {
        GatewayError::RemoteHttpError { status, .. } => {
            matches!(status, 429 | 502 | 503 | 504)
        }
        GatewayError::TransportRecoverable { .. } => true,
        _ => false,
    }
}

/// Decorates an inner [`SubAgentTransport`] with exponential backoff retry.
///
/// Realizing the retry interceptor as an outer transport decorator (rather
/// than a chain member) keeps the interceptor chain's Before/After contract
/// free of control-flow loops: the chain runs once per attempt, and this
/// decorator owns the attempt loop around it.
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryTransport<T> {
    /// Wrap `inner` with the given retry policy.
    #[must_use]
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T: SubAgentTransport> SubAgentTransport for RetryTransport<T> {
    async fn query(&self, ctx: &CallContext, text: &str) -> Result<String, GatewayError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.query(ctx, text).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.policy.max_attempts && is_retryable(&err) => {
                    let delay = self.policy.delay_for(attempt);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn close(&self) -> Result<(), GatewayError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyTransport {
        failures_before_success: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SubAgentTransport for FlakyTransport {
        async fn query(&self, _ctx: &CallContext, _text: &str) -> Result<String, GatewayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(GatewayError::RemoteHttpError {
                    agent: "agent-a".into(),
                    status: 503,
                })
            } else {
                Ok("recovered".to_string())
            }
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let transport = RetryTransport::new(
            FlakyTransport {
                failures_before_success: 2,
                calls: calls.clone(),
            },
            RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                multiplier: 1.0,
                max_delay: Duration::from_millis(5),
            },
        );

        let ctx = CallContext::new();
        let result = transport.query(&ctx, "hi").await.unwrap();
        assert_eq!(result, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let transport = RetryTransport::new(
            FlakyTransport {
                failures_before_success: 10,
                calls: calls.clone(),
            },
            RetryPolicy {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                multiplier: 1.0,
                max_delay: Duration::from_millis(5),
            },
        );

        let ctx = CallContext::new();
        let result = transport.query(&ctx, "hi").await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn non_retryable_errors_are_not_retried() {
        let err = GatewayError::ConfigInvalid {
            agent: "a".into(),
            message: "bad".into(),
        };
        assert!(!is_retryable(&err));
    }

    #[test]
    fn truncate_response_appends_marker_when_over_limit() {
        let long = "x".repeat(TRUNCATION_LIMIT_BYTES + 10);
        let result = truncate_response(long);
        assert!(result.ends_with(TRUNCATION_MARKER));
        assert!(result.len() <= TRUNCATION_LIMIT_BYTES + TRUNCATION_MARKER.len());
    }

    #[test]
    fn truncate_response_leaves_short_text_untouched() {
        let short = "hello".to_string();
        assert_eq!(truncate_response(short.clone()), short);
    }
}
