//! Call timing and metrics recording.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use super::{Exchange, Interceptor, OutboundRequest};
use crate::error::GatewayError;
use crate::metrics::Metrics;

/// Before: records a start time. After: computes elapsed duration, records
/// `(agent, duration, success)` to the process-wide [`Metrics`] collector,
/// and logs at info (success) or error (failure).
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn before(
        &self,
        exchange: &mut Exchange<'_>,
        _request: &mut OutboundRequest,
    ) -> Result<(), GatewayError> {
        exchange.state.started_at = Some(Instant::now());
        Ok(())
    }

    async fn after(&self, exchange: &mut Exchange<'_>, result: &mut Result<String, GatewayError>) {
        let elapsed = exchange
            .state
            .started_at
            .map_or_else(Default::default, |start| start.elapsed());
        let success = result.is_ok();

        Metrics::global().record_call(exchange.agent, elapsed, success);

        match result {
            Ok(_) => info!(agent = exchange.agent, elapsed_ms = elapsed.as_millis(), "sub-agent call succeeded"),
            Err(err) => error!(agent = exchange.agent, elapsed_ms = elapsed.as_millis(), error = %err, "sub-agent call failed"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::CallContext;
    use crate::interceptor::ExchangeState;

    #[tokio::test]
    async fn records_elapsed_time_and_outcome() {
        let interceptor = LoggingInterceptor;
        let ctx = CallContext::new();
        let mut exchange = Exchange {
            agent: "agent-a",
            call_context: &ctx,
            state: ExchangeState::default(),
            propagate_session_id: true,
        };
        let mut request = OutboundRequest::new("hi");
        interceptor.before(&mut exchange, &mut request).await.unwrap();
        assert!(exchange.state.started_at.is_some());

        let mut result: Result<String, GatewayError> = Ok("ok".into());
        interceptor.after(&mut exchange, &mut result).await;
        assert!(result.is_ok());
    }
}
