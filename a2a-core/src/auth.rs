//! Auth resolution: turns an [`crate::config::AuthSpec`] into outbound
//! headers, refreshing OAuth2 tokens on demand.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::AuthSpec;
use crate::error::GatewayError;

/// Refresh an OAuth2 token this long before it actually expires.
const REFRESH_SKEW: Duration = Duration::from_secs(30);

/// Resolves an [`AuthSpec`] into outbound request headers for a single
/// sub-agent, caching and refreshing OAuth2 tokens as needed.
///
/// Constructed once per sub-agent at client build time; cheap to clone
/// (the OAuth2 cache is shared via `Arc`).
#[derive(Clone)]
pub enum Authenticator {
    /// No authentication headers are added.
    None,
    /// A static header is added to every request.
    Static {
        /// Header name.
        header: HeaderName,
        /// Header value.
        value: HeaderValue,
    },
    /// An OAuth2 client-credentials token is fetched and cached, refreshing
    /// shortly before expiry.
    OAuth2(Arc<OAuth2State>),
}

/// Shared, refreshable OAuth2 token state for one sub-agent.
pub struct OAuth2State {
    agent: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: RwLock<Option<CachedToken>>,
    http: reqwest::Client,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

const fn default_expires_in() -> u64 {
    3600
}

impl Authenticator {
    /// Resolve `spec` into an [`Authenticator`] for `agent`, reading secrets
    /// from the process environment.
    ///
    /// Fails construction if a referenced environment variable is unset, or
    /// if an OAuth2 `token_url` does not begin with `https://`.
    pub fn resolve(
        agent: &str,
        spec: &AuthSpec,
        http: reqwest::Client,
    ) -> Result<Self, GatewayError> {
        match spec {
            AuthSpec::None => Ok(Self::None),
            AuthSpec::ApiKey { header, key_env } => {
                let key = read_env(agent, key_env)?;
                let header_name = HeaderName::try_from(header.as_str()).map_err(|_err| {
                    GatewayError::ConfigInvalid {
                        agent: agent.to_string(),
                        message: format!("invalid header name '{header}'"),
                    }
                })?;
                let value = HeaderValue::from_str(&key).map_err(|_err| GatewayError::ConfigInvalid {
                    agent: agent.to_string(),
                    message: "API key is not a valid header value".to_string(),
                })?;
                Ok(Self::Static {
                    header: header_name,
                    value,
                })
            }
            AuthSpec::Bearer { token_env } => {
                let token = read_env(agent, token_env)?;
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_err| {
                    GatewayError::ConfigInvalid {
                        agent: agent.to_string(),
                        message: "bearer token is not a valid header value".to_string(),
                    }
                })?;
                Ok(Self::Static {
                    header: AUTHORIZATION,
                    value,
                })
            }
            AuthSpec::OAuth2 {
                token_url,
                client_id_env,
                client_secret_env,
                scopes,
            } => {
                if !token_url.to_ascii_lowercase().starts_with("https://") {
                    return Err(GatewayError::ConfigInvalid {
                        agent: agent.to_string(),
                        message: "OAuth2 token_url must use https".to_string(),
                    });
                }
                let client_id = read_env(agent, client_id_env)?;
                let client_secret = read_env(agent, client_secret_env)?;
                Ok(Self::OAuth2(Arc::new(OAuth2State {
                    agent: agent.to_string(),
                    token_url: token_url.clone(),
                    client_id,
                    client_secret,
                    scope: scopes.join(" "),
                    cache: RwLock::new(None),
                    http,
                })))
            }
        }
    }

    /// Apply this authenticator's headers onto an outbound request.
    pub async fn apply(&self, headers: &mut HeaderMap) -> Result<(), GatewayError> {
        match self {
            Self::None => Ok(()),
            Self::Static { header, value } => {
                headers.insert(header.clone(), value.clone());
                Ok(())
            }
            Self::OAuth2(state) => {
                let token = state.token().await?;
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_err| {
                    GatewayError::TransportFatal {
                        agent: state.agent.clone(),
                        message: "refreshed OAuth2 token is not a valid header value".to_string(),
                    }
                })?;
                headers.insert(AUTHORIZATION, value);
                Ok(())
            }
        }
    }
}

impl OAuth2State {
    /// Return a valid access token, refreshing first if the cached token is
    /// absent or within [`REFRESH_SKEW`] of expiry.
    async fn token(&self) -> Result<String, GatewayError> {
        {
            let cached = self.cache.read().await;
            if let Some(tok) = cached.as_ref() {
                if tok.expires_at > Instant::now() + REFRESH_SKEW {
                    return Ok(tok.access_token.clone());
                }
            }
        }

        let mut cached = self.cache.write().await;
        if let Some(tok) = cached.as_ref() {
            if tok.expires_at > Instant::now() + REFRESH_SKEW {
                return Ok(tok.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken, GatewayError> {
        let mut params = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if !self.scope.is_empty() {
            params.push(("scope", self.scope.as_str()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest(&self.agent, &err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::RemoteHttpError {
                agent: self.agent.clone(),
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::from_reqwest(&self.agent, &err))?;

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

fn read_env(agent: &str, var: &str) -> Result<String, GatewayError> {
    std::env::var(var).map_err(|_err| GatewayError::ConfigInvalid {
        agent: agent.to_string(),
        message: format!("environment variable '{var}' is not set"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn none_spec_resolves_to_no_auth() {
        let auth = Authenticator::resolve("agent-a", &AuthSpec::None, reqwest::Client::new())
            .unwrap();
        assert!(matches!(auth, Authenticator::None));
    }

    #[test]
    fn api_key_missing_env_var_fails() {
        let spec = AuthSpec::ApiKey {
            header: "X-API-Key".into(),
            key_env: "A2A_CORE_TEST_MISSING_VAR_XYZ".into(),
        };
        let err = Authenticator::resolve("agent-a", &spec, reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, GatewayError::ConfigInvalid { .. }));
    }

    #[test]
    fn bearer_resolves_when_env_var_present() {
        std::env::set_var("A2A_CORE_TEST_BEARER_TOKEN", "secret-token");
        let spec = AuthSpec::Bearer {
            token_env: "A2A_CORE_TEST_BEARER_TOKEN".into(),
        };
        let auth = Authenticator::resolve("agent-a", &spec, reqwest::Client::new()).unwrap();
        assert!(matches!(auth, Authenticator::Static { .. }));
        std::env::remove_var("A2A_CORE_TEST_BEARER_TOKEN");
    }

    #[test]
    fn oauth2_rejects_non_https_token_url() {
        std::env::set_var("A2A_CORE_TEST_CID", "id");
        std::env::set_var("A2A_CORE_TEST_SECRET", "secret");
        let spec = AuthSpec::OAuth2 {
            token_url: "http://auth.example.com/token".into(),
            client_id_env: "A2A_CORE_TEST_CID".into(),
            client_secret_env: "A2A_CORE_TEST_SECRET".into(),
            scopes: vec![],
        };
        let err = Authenticator::resolve("agent-a", &spec, reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, GatewayError::ConfigInvalid { .. }));
        std::env::remove_var("A2A_CORE_TEST_CID");
        std::env::remove_var("A2A_CORE_TEST_SECRET");
    }

    #[test]
    fn oauth2_accepts_https_token_url_with_env_vars_present() {
        std::env::set_var("A2A_CORE_TEST_CID2", "id");
        std::env::set_var("A2A_CORE_TEST_SECRET2", "secret");
        let spec = AuthSpec::OAuth2 {
            token_url: "HTTPS://auth.example.com/token".into(),
            client_id_env: "A2A_CORE_TEST_CID2".into(),
            client_secret_env: "A2A_CORE_TEST_SECRET2".into(),
            scopes: vec!["read".into(), "write".into()],
        };
        let auth = Authenticator::resolve("agent-a", &spec, reqwest::Client::new()).unwrap();
        assert!(matches!(auth, Authenticator::OAuth2(_)));
        std::env::remove_var("A2A_CORE_TEST_CID2");
        std::env::remove_var("A2A_CORE_TEST_SECRET2");
    }
}
