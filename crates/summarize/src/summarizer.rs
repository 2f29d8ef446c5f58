use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SummarizeError;

/// Raw digest as returned by a summarizer, before tag and summary cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestDraft {
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

/// External text summarizer used by [`DigestOrchestrator`](crate::DigestOrchestrator).
///
/// Implementations may fail or return unusable output; the orchestrator
/// cleans and validates whatever comes back.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes one window into bullet lines. Lines may still carry list
    /// markers.
    async fn summarize_chunk(&self, index: usize, text: &str)
        -> Result<Vec<String>, SummarizeError>;

    /// Produces the final digest for a full transcript or for aggregated
    /// window bullets.
    async fn produce_digest(&self, text: &str) -> Result<DigestDraft, SummarizeError>;

    /// Label used in logs.
    fn name(&self) -> &str {
        "summarizer"
    }
}
