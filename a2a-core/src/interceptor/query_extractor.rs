//! Optional query summarization before dispatch to a remote sub-agent.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use super::{Exchange, Interceptor, OutboundRequest};
use crate::error::GatewayError;

const SUMMARIZER_DEADLINE: Duration = Duration::from_secs(10);

/// Condenses a query, parameterized by the remote agent's self-description.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a condensed version of `text` for `remote_description`, or
    /// `None` if summarization is not applicable.
    async fn summarize(&self, remote_description: &str, text: &str) -> Option<String>;
}

/// Before: replaces the outbound text with a shorter, summarizer-produced
/// version, parameterized by the remote agent's description fetched once at
/// client construction. Disabled (pass-through) unless a [`Summarizer`] is
/// configured.
///
/// Failures, empty input, timeouts, and non-shorter summaries all leave the
/// payload untouched — this interceptor never fails the call.
pub struct QueryExtractorInterceptor {
    summarizer: Option<std::sync::Arc<dyn Summarizer>>,
    remote_description: String,
}

impl QueryExtractorInterceptor {
    /// Build a query-extractor interceptor. Pass `summarizer: None` to get a
    /// pass-through interceptor (the default when this optional feature is
    /// not configured for a sub-agent).
    #[must_use]
    pub fn new(summarizer: Option<std::sync::Arc<dyn Summarizer>>, remote_description: String) -> Self {
        Self {
            summarizer,
            remote_description,
        }
    }
}

#[async_trait]
impl Interceptor for QueryExtractorInterceptor {
    async fn before(
        &self,
        _exchange: &mut Exchange<'_>,
        request: &mut OutboundRequest,
    ) -> Result<(), GatewayError> {
        let Some(summarizer) = &self.summarizer else {
            return Ok(());
        };
        if request.text.trim().is_empty() {
            return Ok(());
        }

        let summary = timeout(
            SUMMARIZER_DEADLINE,
            summarizer.summarize(&self.remote_description, &request.text),
        )
        .await
        .ok()
        .flatten();

        if let Some(summary) = summary {
            if summary.len() < request.text.len() {
                request.text = summary;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::CallContext;
    use crate::interceptor::ExchangeState;

    struct FixedSummarizer(&'static str);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _remote_description: &str, _text: &str) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _remote_description: &str, _text: &str) -> Option<String> {
            None
        }
    }

    fn exchange(ctx: &CallContext) -> Exchange<'_> {
        Exchange {
            agent: "agent-a",
            call_context: ctx,
            state: ExchangeState::default(),
            propagate_session_id: true,
        }
    }

    #[tokio::test]
    async fn no_summarizer_is_pass_through() {
        let interceptor = QueryExtractorInterceptor::new(None, "remote agent".into());
        let ctx = CallContext::new();
        let mut request = OutboundRequest::new("a very long original query text here");
        interceptor.before(&mut exchange(&ctx), &mut request).await.unwrap();
        assert_eq!(request.text, "a very long original query text here");
    }

    #[tokio::test]
    async fn shorter_summary_replaces_text() {
        let interceptor =
            QueryExtractorInterceptor::new(Some(std::sync::Arc::new(FixedSummarizer("short"))), "remote".into());
        let ctx = CallContext::new();
        let mut request = OutboundRequest::new("a very long original query text here");
        interceptor.before(&mut exchange(&ctx), &mut request).await.unwrap();
        assert_eq!(request.text, "short");
    }

    #[tokio::test]
    async fn longer_summary_is_discarded() {
        let interceptor = QueryExtractorInterceptor::new(
            Some(std::sync::Arc::new(FixedSummarizer(
                "a much much much longer summary than the original",
            ))),
            "remote".into(),
        );
        let ctx = CallContext::new();
        let mut request = OutboundRequest::new("short query");
        interceptor.before(&mut exchange(&ctx), &mut request).await.unwrap();
        assert_eq!(request.text, "short query");
    }

    #[tokio::test]
    async fn failed_summarization_leaves_text_untouched() {
        let interceptor = QueryExtractorInterceptor::new(Some(std::sync::Arc::new(FailingSummarizer)), "remote".into());
        let ctx = CallContext::new();
        let mut request = OutboundRequest::new("original text");
        interceptor.before(&mut exchange(&ctx), &mut request).await.unwrap();
        assert_eq!(request.text, "original text");
    }

    #[tokio::test]
    async fn empty_text_skips_summarization() {
        let interceptor =
            QueryExtractorInterceptor::new(Some(std::sync::Arc::new(FixedSummarizer("x"))), "remote".into());
        let ctx = CallContext::new();
        let mut request = OutboundRequest::new("   ");
        interceptor.before(&mut exchange(&ctx), &mut request).await.unwrap();
        assert_eq!(request.text, "   ");
    }
}
