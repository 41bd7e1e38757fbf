//! Converts recoverable transport failures into a synthetic, agent-authored
//! answer so the caller always receives text back.

use async_trait::async_trait;

use super::{Exchange, Interceptor, OutboundRequest};
use crate::error::GatewayError;

/// After only, and registered outermost so it runs last: if `result` carries
/// a [`GatewayError::recoverable`] error, replaces it with a synthetic
/// success payload describing the outage. Non-recoverable errors propagate
/// unchanged.
pub struct ErrorRecoveryInterceptor;

#[async_trait]
impl Interceptor for ErrorRecoveryInterceptor {
    async fn before(
        &self,
        _exchange: &mut Exchange<'_>,
        _request: &mut OutboundRequest,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn after(&self, exchange: &mut Exchange<'_>, result: &mut Result<String, GatewayError>) {
        let should_recover = matches!(result, Err(err) if err.recoverable());
        if !should_recover {
            return;
        }

        let Err(err) = std::mem::replace(result, Ok(String::new())) else {
            unreachable!("should_recover implies Err");
        };

        *result = Ok(format!(
            "Error: the sub-agent '{}' is currently unavailable. Reason: {err}. Please inform the user and suggest retrying later.",
            exchange.agent
        ));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::CallContext;
    use crate::interceptor::ExchangeState;

    fn exchange(ctx: &CallContext) -> Exchange<'_> {
        Exchange {
            agent: "billing-agent",
            call_context: ctx,
            state: ExchangeState::default(),
            propagate_session_id: true,
        }
    }

    #[tokio::test]
    async fn recoverable_error_becomes_synthetic_success() {
        let interceptor = ErrorRecoveryInterceptor;
        let ctx = CallContext::new();
        let mut result: Result<String, GatewayError> = Err(GatewayError::TransportRecoverable {
            agent: "billing-agent".into(),
            message: "connection refused".into(),
        });
        interceptor.after(&mut exchange(&ctx), &mut result).await;

        let text = result.unwrap();
        assert!(text.contains("billing-agent"));
        assert!(text.contains("currently unavailable"));
    }

    #[tokio::test]
    async fn fatal_error_propagates_unchanged() {
        let interceptor = ErrorRecoveryInterceptor;
        let ctx = CallContext::new();
        let mut result: Result<String, GatewayError> = Err(GatewayError::ConfigInvalid {
            agent: "billing-agent".into(),
            message: "bad config".into(),
        });
        interceptor.after(&mut exchange(&ctx), &mut result).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn success_is_untouched() {
        let interceptor = ErrorRecoveryInterceptor;
        let ctx = CallContext::new();
        let mut result: Result<String, GatewayError> = Ok("already fine".into());
        interceptor.after(&mut exchange(&ctx), &mut result).await;
        assert_eq!(result.unwrap(), "already fine");
    }
}
