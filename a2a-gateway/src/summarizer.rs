//! Deterministic stand-in for a model-backed query summarizer.
//!
//! `a2a.query_extractor` is a recognized configuration option, but this
//! crate has no LLM provider client to call out to; the `model` field is
//! accepted and logged, but condensation itself is a plain character-count
//! truncation rather than a real summary.

use a2a_core::interceptor::Summarizer;
use async_trait::async_trait;
use tracing::debug;

/// Condenses a query to at most `max_chars` characters by truncation.
pub struct TruncatingSummarizer {
    max_chars: usize,
    model: Option<String>,
}

impl TruncatingSummarizer {
    /// Build a summarizer that truncates to `max_chars` characters. `model`
    /// is carried for observability only.
    #[must_use]
    pub fn new(max_chars: usize, model: Option<String>) -> Self {
        Self { max_chars, model }
    }
}

#[async_trait]
impl Summarizer for TruncatingSummarizer {
    async fn summarize(&self, remote_description: &str, text: &str) -> Option<String> {
        if text.chars().count() <= self.max_chars {
            return None;
        }
        debug!(
            model = ?self.model,
            remote_description,
            original_len = text.len(),
            "truncating query for query-extractor interceptor"
        );
        Some(text.chars().take(self.max_chars).collect())
    }
}
