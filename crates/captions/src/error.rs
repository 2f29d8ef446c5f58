use thiserror::Error;

/// Errors that can occur while normalizing a caption document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptionError {
    /// The document contained no cue text once headers, metadata blocks,
    /// timings and markup were removed.
    #[error("transcript empty after caption normalization")]
    EmptyTranscript,
}
