//! Stamps the resolved sub-agent auth header onto outbound requests.

use async_trait::async_trait;

use super::{Exchange, Interceptor, OutboundRequest};
use crate::auth::Authenticator;
use crate::error::GatewayError;

/// Before: applies the resolved [`Authenticator`] for this sub-agent.
pub struct AuthInterceptor {
    authenticator: Authenticator,
}

impl AuthInterceptor {
    /// Wrap a resolved authenticator as an interceptor.
    #[must_use]
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    async fn before(
        &self,
        _exchange: &mut Exchange<'_>,
        request: &mut OutboundRequest,
    ) -> Result<(), GatewayError> {
        self.authenticator.apply(&mut request.headers).await
    }
}
