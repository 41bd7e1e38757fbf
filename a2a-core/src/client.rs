//! Assembles a [`SubAgentConfig`] into a running sub-agent client: endpoint
//! validation, auth resolution, agent-card discovery, and the interceptor
//! chain, behind the transport's uniform `query` capability.

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::{Protocol, SubAgentConfig};
use crate::context::CallContext;
use crate::error::GatewayError;
use crate::guard::validate_endpoint;
use crate::interceptor::{
    AuthInterceptor, ErrorRecoveryInterceptor, IdentityContext, IdentityInterceptor,
    IdentityProvider, Interceptor, LoggingInterceptor, QueryExtractorInterceptor, Summarizer,
    TokenSource,
};
use crate::transport::{a2a::discover_agent_card, A2aTransport, RestTransport, RetryPolicy, RetryTransport, SubAgentTransport};

/// Shared, optional pieces of the interceptor chain an operator may plug in
/// for every sub-agent client built in a process.
#[derive(Clone)]
pub struct ClientExtensions {
    /// Ambient caller-identity provider.
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
    /// Optional identity-token exchange source.
    pub token_source: Option<Arc<dyn TokenSource>>,
    /// Optional query summarizer for the query-extractor interceptor.
    pub summarizer: Option<Arc<dyn Summarizer>>,
    /// Retry policy applied to every transport.
    pub retry_policy: RetryPolicy,
    /// Whether A2A transports operate in polling mode. Polling and
    /// streaming are mutually exclusive, so a served agent card reports
    /// `capabilities.streaming = false` while this is `true`.
    pub polling_enabled: bool,
}

impl Default for ClientExtensions {
    fn default() -> Self {
        Self {
            identity_provider: None,
            token_source: None,
            summarizer: None,
            retry_policy: RetryPolicy::default(),
            polling_enabled: true,
        }
    }
}

/// A constructed, ready-to-call sub-agent client.
pub struct SubAgentClient {
    name: String,
    description: String,
    transport: Box<dyn SubAgentTransport>,
}

impl SubAgentClient {
    /// Build a client for `config`, running SSRF validation, auth
    /// resolution, and (for A2A) agent-card discovery.
    pub async fn build(config: &SubAgentConfig, extensions: &ClientExtensions) -> Result<Self, GatewayError> {
        let url = validate_endpoint(&config.endpoint).map_err(|source| GatewayError::EndpointBlocked {
            agent: config.name.clone(),
            source,
        })?;

        let timeout = config.timeout_or_default();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::from_reqwest(&config.name, &err))?;

        let authenticator = Authenticator::resolve(&config.name, &config.auth, http.clone())?;

        let identity_provider = extensions
            .identity_provider
            .clone()
            .unwrap_or_else(|| Arc::new(IdentityContext::default()));

        // Card discovery is always best-effort and never blocks construction;
        // for REST agents a missing card just yields a generic description.
        let card = discover_agent_card(&http, url.as_str()).await;
        if matches!(config.protocol, Protocol::A2a) && extensions.polling_enabled && card.capabilities.streaming {
            tracing::debug!(
                agent = %config.name,
                "remote agent advertises streaming, but polling mode is enabled; using synchronous polling calls"
            );
        }

        let chain = vec![
            Box::new(IdentityInterceptor::new(
                identity_provider,
                extensions.token_source.clone(),
            )) as Box<dyn Interceptor>,
            Box::new(QueryExtractorInterceptor::new(
                extensions.summarizer.clone(),
                card.description.clone(),
            )),
            Box::new(LoggingInterceptor),
            Box::new(AuthInterceptor::new(authenticator)),
            Box::new(ErrorRecoveryInterceptor),
        ];
        let interceptor_chain = crate::interceptor::InterceptorChain::new(chain);

        let transport: Box<dyn SubAgentTransport> = match config.protocol {
            Protocol::A2a => Box::new(RetryTransport::new(
                A2aTransport::new(
                    config.name.clone(),
                    url.to_string(),
                    http,
                    interceptor_chain,
                    extensions.polling_enabled,
                ),
                extensions.retry_policy,
            )),
            Protocol::Rest => {
                let rest_url = format!(
                    "{}{}",
                    url.to_string().trim_end_matches('/'),
                    config.api_path_or_default()
                );
                Box::new(RetryTransport::new(
                    RestTransport::new(config.name.clone(), rest_url, http, interceptor_chain, false),
                    extensions.retry_policy,
                ))
            }
        };

        let description = if card.description.is_empty() {
            format!("Query the '{}' sub-agent", config.name)
        } else {
            card.description
        };

        Ok(Self {
            name: config.name.clone(),
            description,
            transport,
        })
    }

    /// This client's sub-agent name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description derived from the remote agent card, or a default.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Send `text` under `ctx` and return the extracted response text.
    pub async fn query(&self, ctx: &CallContext, text: &str) -> Result<String, GatewayError> {
        self.transport.query(ctx, text).await
    }

    /// Release transport resources. Errors are returned to the caller to
    /// collect, not propagated as panics.
    pub async fn close(&self) -> Result<(), GatewayError> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocked_endpoint_fails_construction() {
        let config = SubAgentConfig {
            name: "billing".into(),
            endpoint: "http://169.254.169.254/".into(),
            protocol: Protocol::Rest,
            api_path: None,
            timeout: None,
            auth: crate::config::AuthSpec::None,
        };
        let err = SubAgentClient::build(&config, &ClientExtensions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::EndpointBlocked { .. }));
    }
}
