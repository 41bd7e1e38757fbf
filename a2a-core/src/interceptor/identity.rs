//! Identity propagation: stamps caller-identity headers onto every outbound
//! request, and optionally exchanges an identity token.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use tracing::warn;

use super::{Exchange, Interceptor, OutboundRequest};
use crate::error::GatewayError;

/// Ambient identity of the caller on whose behalf a sub-agent call is made.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    /// Caller's email address.
    pub user_email: Option<String>,
    /// Group memberships, serialized as a JSON array.
    pub user_groups: Vec<String>,
    /// Upstream chat user id (e.g. Slack), if known.
    pub slack_user_id: Option<String>,
    /// Symbolic caller identifier.
    pub caller_id: Option<String>,
    /// Session correlation id.
    pub session_id: Option<String>,
}

/// Supplies the ambient [`IdentityContext`] for the current call.
pub trait IdentityProvider: Send + Sync {
    /// Return the identity to stamp onto the current outbound request.
    fn current(&self) -> IdentityContext;
}

/// A no-op provider for deployments with no caller-identity concept.
impl IdentityProvider for IdentityContext {
    fn current(&self) -> IdentityContext {
        self.clone()
    }
}

/// Exchanges the ambient identity for a JWT to present to sub-agents.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch a token for `identity`, or `None` if exchange fails.
    async fn token(&self, identity: &IdentityContext) -> Option<String>;
}

/// Writes `X-User-*`, `X-Slack-User-Id`, `X-Caller-Id`, `X-Session-Id`, and
/// (when a token source is configured) `Authorization: Bearer <jwt>`.
pub struct IdentityInterceptor {
    provider: std::sync::Arc<dyn IdentityProvider>,
    token_source: Option<std::sync::Arc<dyn TokenSource>>,
}

impl IdentityInterceptor {
    /// Build an identity interceptor from a provider and optional token source.
    #[must_use]
    pub fn new(
        provider: std::sync::Arc<dyn IdentityProvider>,
        token_source: Option<std::sync::Arc<dyn TokenSource>>,
    ) -> Self {
        Self {
            provider,
            token_source,
        }
    }
}

fn insert_header(headers: &mut reqwest::header::HeaderMap, name: &'static str, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), v);
    }
}

#[async_trait]
impl Interceptor for IdentityInterceptor {
    async fn before(
        &self,
        exchange: &mut Exchange<'_>,
        request: &mut OutboundRequest,
    ) -> Result<(), GatewayError> {
        let identity = self.provider.current();

        if let Some(email) = &identity.user_email {
            insert_header(&mut request.headers, "x-user-id", email);
            insert_header(&mut request.headers, "x-user-email", email);
        }
        if !identity.user_groups.is_empty() {
            if let Ok(groups_json) = serde_json::to_string(&identity.user_groups) {
                insert_header(&mut request.headers, "x-user-groups", &groups_json);
            }
        }
        if let Some(slack_id) = &identity.slack_user_id {
            insert_header(&mut request.headers, "x-slack-user-id", slack_id);
        }
        if let Some(caller_id) = &identity.caller_id {
            insert_header(&mut request.headers, "x-caller-id", caller_id);
        }
        if exchange.propagate_session_id {
            if let Some(session_id) = &identity.session_id {
                insert_header(&mut request.headers, "x-session-id", session_id);
            }
        }

        if let Some(source) = &self.token_source {
            match source.token(&identity).await {
                Some(token) => {
                    if let Ok(v) = HeaderValue::from_str(&format!("Bearer {token}")) {
                        request.headers.insert(AUTHORIZATION, v);
                    }
                }
                None => warn!("identity token exchange failed, proceeding without it"),
            }
        }

        Ok(())
    }
}
