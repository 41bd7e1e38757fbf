//! The Before/After interceptor chain wrapped around every outbound
//! sub-agent call.
//!
//! There is no inheritance here: a chain is a `Vec<Box<dyn Interceptor>>`
//! closed over at [`InterceptorChain::new`]. Before hooks run in
//! registration order; After hooks run in reverse, so the first interceptor
//! registered is the last to see the response on the way back out.

pub mod auth;
pub mod error_recovery;
pub mod identity;
pub mod logging;
pub mod query_extractor;

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::context::CallContext;
use crate::error::GatewayError;

pub use auth::AuthInterceptor;
pub use error_recovery::ErrorRecoveryInterceptor;
pub use identity::{IdentityContext, IdentityInterceptor, IdentityProvider, TokenSource};
pub use logging::LoggingInterceptor;
pub use query_extractor::{QueryExtractorInterceptor, Summarizer};

/// The outbound request body being assembled, mutable across Before hooks.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// Headers to send with the request.
    pub headers: HeaderMap,
    /// The query text, possibly rewritten (e.g. summarized) before send.
    pub text: String,
}

impl OutboundRequest {
    /// Start a new outbound request for `text` with no headers set yet.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            headers: HeaderMap::new(),
            text: text.into(),
        }
    }
}

/// Per-call scratch state threaded through Before/After for interceptors
/// that need to correlate the two (currently only timing).
#[derive(Debug, Default)]
pub struct ExchangeState {
    started_at: Option<Instant>,
}

/// The call-scoped context passed to every interceptor.
pub struct Exchange<'a> {
    /// Name of the sub-agent being called.
    pub agent: &'a str,
    /// The propagated call context for this hop.
    pub call_context: &'a CallContext,
    /// Scratch state shared across this chain's Before/After for this call.
    pub state: ExchangeState,
    /// Whether the active transport wants `X-Session-Id` propagated to the
    /// remote agent. A2A always propagates it; REST defaults this off per
    /// sub-agent config.
    pub propagate_session_id: bool,
}

/// A single Before/After hook pair.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Run before the request is sent. May mutate headers/text or abort the
    /// call entirely by returning `Err`.
    async fn before(
        &self,
        _exchange: &mut Exchange<'_>,
        _request: &mut OutboundRequest,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    /// Run after the request completes (success or failure). May rewrite
    /// `result` — most notably, error-recovery replaces a recoverable error
    /// with a synthetic success payload.
    async fn after(&self, _exchange: &mut Exchange<'_>, _result: &mut Result<String, GatewayError>) {}
}

/// An ordered, immutable chain of interceptors.
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Build a chain from interceptors in registration order.
    #[must_use]
    pub fn new(interceptors: Vec<Box<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    /// Run every interceptor's Before hook in registration order. Stops and
    /// propagates the first error encountered.
    pub async fn run_before(
        &self,
        exchange: &mut Exchange<'_>,
        request: &mut OutboundRequest,
    ) -> Result<(), GatewayError> {
        for interceptor in &self.interceptors {
            interceptor.before(exchange, request).await?;
        }
        Ok(())
    }

    /// Run every interceptor's After hook in reverse registration order.
    pub async fn run_after(
        &self,
        exchange: &mut Exchange<'_>,
        result: &mut Result<String, GatewayError>,
    ) {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.after(exchange, result).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>, &'static str);

    #[async_trait]
    impl Interceptor for Recorder {
        async fn before(
            &self,
            _exchange: &mut Exchange<'_>,
            _request: &mut OutboundRequest,
        ) -> Result<(), GatewayError> {
            self.0.lock().unwrap().push(self.1);
            Ok(())
        }

        async fn after(&self, _exchange: &mut Exchange<'_>, _result: &mut Result<String, GatewayError>) {
            self.0.lock().unwrap().push(self.1);
        }
    }

    #[tokio::test]
    async fn before_runs_forward_after_runs_reverse() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(vec![
            Box::new(Recorder(log.clone(), "a")),
            Box::new(Recorder(log.clone(), "b")),
            Box::new(Recorder(log.clone(), "c")),
        ]);

        let ctx = CallContext::new();
        let mut exchange = Exchange {
            agent: "agent-a",
            call_context: &ctx,
            state: ExchangeState::default(),
            propagate_session_id: true,
        };
        let mut request = OutboundRequest::new("hi");
        chain.run_before(&mut exchange, &mut request).await.unwrap();

        let mut result: Result<String, GatewayError> = Ok("ok".to_string());
        chain.run_after(&mut exchange, &mut result).await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "c", "b", "a"]);
    }
}
