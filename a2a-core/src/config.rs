//! Configuration data model for sub-agents.
//!
//! These types describe *what* to connect to; [`crate::auth`] resolves
//! [`AuthSpec`] into live credentials and [`crate::client`] turns a
//! [`SubAgentConfig`] into a running [`crate::client::SubAgentClient`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wire protocol used to reach a sub-agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// A2A JSON-RPC 2.0, with agent-card discovery.
    A2a,
    /// Plain REST with format-tolerant response parsing.
    Rest,
}

/// Authentication scheme for a sub-agent, as read from configuration.
///
/// Only the *name* of the environment variable holding a secret is ever
/// stored here — never the secret itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSpec {
    /// No authentication.
    None,
    /// A static API key sent as a named header.
    ApiKey {
        /// Header name to send the key under (e.g. `"X-API-Key"`).
        header: String,
        /// Name of the environment variable holding the key.
        key_env: String,
    },
    /// A static bearer token.
    Bearer {
        /// Name of the environment variable holding the token.
        token_env: String,
    },
    /// OAuth2 client-credentials flow with cached, auto-refreshed tokens.
    OAuth2 {
        /// Token endpoint URL. Must be `https://`.
        token_url: String,
        /// Name of the environment variable holding the client id.
        client_id_env: String,
        /// Name of the environment variable holding the client secret.
        client_secret_env: String,
        /// OAuth2 scopes to request, joined with a single space at refresh time.
        #[serde(default)]
        scopes: Vec<String>,
    },
}

impl Default for AuthSpec {
    fn default() -> Self {
        Self::None
    }
}

/// Configuration for a single sub-agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAgentConfig {
    /// Unique sub-agent name, also used to derive its `query_<name>` tool.
    pub name: String,
    /// Base endpoint URL.
    pub endpoint: String,
    /// Transport protocol.
    pub protocol: Protocol,
    /// REST-only: path appended to `endpoint` (default `/query`).
    #[serde(default)]
    pub api_path: Option<String>,
    /// Per-call timeout. Defaults to 180s if unset.
    #[serde(default, with = "humantime_seconds")]
    pub timeout: Option<Duration>,
    /// Authentication scheme.
    #[serde(default)]
    pub auth: AuthSpec,
}

impl SubAgentConfig {
    /// REST API path, defaulting to `/query`.
    #[must_use]
    pub fn api_path_or_default(&self) -> &str {
        self.api_path.as_deref().unwrap_or("/query")
    }

    /// Effective per-call timeout, defaulting to 180 seconds.
    #[must_use]
    pub fn timeout_or_default(&self) -> Duration {
        self.timeout.unwrap_or(Duration::from_secs(180))
    }
}

/// Serializes/deserializes an optional [`Duration`] as a plain integer
/// number of seconds in TOML, matching how operators are expected to write
/// `timeout = 30` rather than a humantime string.
mod humantime_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_api_path_is_query() {
        let cfg = SubAgentConfig {
            name: "billing".into(),
            endpoint: "http://billing.internal".into(),
            protocol: Protocol::Rest,
            api_path: None,
            timeout: None,
            auth: AuthSpec::None,
        };
        assert_eq!(cfg.api_path_or_default(), "/query");
        assert_eq!(cfg.timeout_or_default(), Duration::from_secs(180));
    }

    #[test]
    fn auth_spec_round_trips_through_json() {
        let spec = AuthSpec::ApiKey {
            header: "X-API-Key".into(),
            key_env: "BILLING_API_KEY".into(),
        };
        let json = serde_json::to_string(&spec).unwrap();
        let parsed: AuthSpec = serde_json::from_str(&json).unwrap();
        matches!(parsed, AuthSpec::ApiKey { .. });
    }
}
