//! TOML-backed configuration for the `a2a-gateway` process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use a2a_core::config::SubAgentConfig;
use a2a_core::transport::RetryPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GatewayProcessError, Result};

/// Top-level gateway configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// This gateway's own agent name, used for loop prevention.
    #[serde(default = "default_self_name")]
    pub self_name: String,
    /// Address to bind the HTTP server to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Whether A2A loop-prevention middleware is active.
    #[serde(default = "default_true")]
    pub loop_prevention_enabled: bool,
    /// Maximum inbound call depth before rejecting with 508.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: u32,
    /// Default concurrency bound for the `query_multiple_agents` tool.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Whether A2A transports operate in polling mode (disables streaming on
    /// this gateway's served agent card).
    #[serde(default = "default_true")]
    pub polling_enabled: bool,
    /// Query-extraction/summarization settings applied before dispatch.
    #[serde(default)]
    pub query_extractor: QueryExtractorConfig,
    /// Context-cleaning settings, recognized for forward compatibility. No
    /// interceptor in this crate implements context cleaning yet.
    #[serde(default)]
    pub context_cleaner: ContextCleanerConfig,
    /// Retry policy applied to every sub-agent transport.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Configured sub-agents.
    #[serde(default)]
    pub sub_agents: Vec<SubAgentConfig>,
}

fn default_self_name() -> String {
    "a2a-gateway".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_call_depth() -> u32 {
    a2a_core::middleware::DEFAULT_MAX_CALL_DEPTH
}

const fn default_max_concurrency() -> usize {
    a2a_core::executor::DEFAULT_MAX_CONCURRENCY
}

/// Query-extraction/summarization settings (`a2a.query_extractor`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryExtractorConfig {
    /// Whether queries are condensed before being sent to a sub-agent.
    #[serde(default)]
    pub enabled: bool,
    /// Name of the summarization model to use. Reserved for a future
    /// LLM-backed summarizer; the shipped summarizer is a deterministic
    /// truncation heuristic and ignores this field beyond logging it.
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for QueryExtractorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: None,
        }
    }
}

/// Context-cleaning settings (`a2a.context_cleaner`), recognized as part of
/// the configuration surface but not wired to any interceptor in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextCleanerConfig {
    /// Whether context cleaning is requested.
    #[serde(default)]
    pub enabled: bool,
    /// Name of the context-cleaning model.
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for ContextCleanerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: None,
        }
    }
}

/// Retry settings (`a2a.retry`), translated into an [`a2a_core::transport::RetryPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Whether retries are attempted at all. `false` caps every transport at
    /// a single attempt.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay, in seconds, before the first retry.
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,
    /// Upper bound, in seconds, on any single retry delay.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
    /// Multiplier applied to the delay after each retry.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_delay_secs() -> f64 {
    0.25
}

const fn default_max_delay_secs() -> f64 {
    10.0
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            initial_delay_secs: default_initial_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Translate this configuration into the policy the transport layer
    /// understands. Disabling retries is expressed as a single-attempt cap
    /// rather than a separate code path through `RetryTransport`.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: if self.enabled { self.max_retries.saturating_add(1) } else { 1 },
            initial_delay: Duration::from_secs_f64(self.initial_delay_secs.max(0.0)),
            multiplier: self.backoff_multiplier,
            max_delay: Duration::from_secs_f64(self.max_delay_secs.max(0.0)),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            self_name: default_self_name(),
            bind_address: default_bind_address(),
            loop_prevention_enabled: true,
            max_call_depth: default_max_call_depth(),
            max_concurrency: default_max_concurrency(),
            polling_enabled: true,
            query_extractor: QueryExtractorConfig::default(),
            context_cleaner: ContextCleanerConfig::default(),
            retry: RetryConfig::default(),
            sub_agents: Vec::new(),
        }
    }
}

/// Severity of a [`ConfigIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    /// Configuration is unusable as-is.
    Error,
    /// Configuration is usable but likely not what the operator intended.
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    /// Severity of the finding.
    pub level: IssueLevel,
    /// Human-readable description.
    pub message: String,
}

impl GatewayConfig {
    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!(path = %path.display(), "no config file found, using defaults");
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| GatewayProcessError::ConfigLoad {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|err| GatewayProcessError::ConfigLoad {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        info!(path = %path.display(), sub_agents = config.sub_agents.len(), "loaded gateway configuration");
        Ok(config)
    }

    /// Persist this configuration to `path` as TOML.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|err| GatewayProcessError::ConfigInvalid(err.to_string()))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
        Ok(())
    }

    /// Default config file location: `~/.config/a2a-gateway/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs_next::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("a2a-gateway")
            .join("config.toml")
    }

    /// Validate semantic constraints this type's `Deserialize` impl cannot
    /// express: duplicate sub-agent names, empty `self_name` when loop
    /// prevention is enabled, zero max call depth.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.loop_prevention_enabled && self.self_name.trim().is_empty() {
            issues.push(ConfigIssue {
                level: IssueLevel::Error,
                message: "self_name must be set when loop_prevention_enabled is true".to_string(),
            });
        }

        if self.max_call_depth == 0 {
            issues.push(ConfigIssue {
                level: IssueLevel::Warning,
                message: "max_call_depth of 0 rejects every inbound A2A call".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for agent in &self.sub_agents {
            if !seen.insert(agent.name.clone()) {
                issues.push(ConfigIssue {
                    level: IssueLevel::Error,
                    message: format!("duplicate sub-agent name '{}'", agent.name),
                });
            }
        }

        if self.sub_agents.is_empty() {
            issues.push(ConfigIssue {
                level: IssueLevel::Warning,
                message: "no sub-agents configured; the gateway will expose no tools".to_string(),
            });
        }

        issues
    }
}
