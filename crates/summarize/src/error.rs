use std::time::Duration;

use thiserror::Error;

/// Errors surfaced while turning a transcript into a digest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SummarizeError {
    /// A window summary contained no usable bullet after cleaning.
    #[error("summarizer returned no usable bullets for chunk {index}")]
    EmptyChunkSummary { index: usize },
    /// Output could not be decoded, or decoded to an empty summary.
    #[error("malformed summarizer output: {0}")]
    Malformed(String),
    /// Network or upstream availability failure (connect errors, 408, 429, 5xx).
    #[error("summarizer transport failure: {0}")]
    Transport(String),
    /// The upstream refused the request outright (auth, bad request).
    #[error("summarizer rejected request: {0}")]
    Rejected(String),
    /// A single summarizer call exceeded its budget.
    #[error("summarizer call timed out after {0:?}")]
    Timeout(Duration),
    /// Nothing left to summarize after whitespace collapse.
    #[error("transcript is empty")]
    EmptyInput,
    #[error("invalid summarizer config: {0}")]
    InvalidConfig(String),
}

impl SummarizeError {
    /// Whether retrying the same input later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}
