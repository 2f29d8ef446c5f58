//! Transcript digesting layer.
//!
//! Takes normalized transcript prose and produces a [`Digest`]: a short
//! summary, up to ten lowercase tags and an optional sentiment label.
//!
//! ## How it works
//!
//! - Short transcripts (within `single_pass_limit` characters) are digested
//!   in one summarizer call.
//! - Long ones are cut into overlapping windows ([`split_windows`]), each
//!   window is reduced to bullet facts concurrently, and the bullets, joined
//!   in window order, are digested in a final call.
//! - Every summarizer call runs under a timeout. Summarizer output is never
//!   trusted: bullets are cleaned, tags normalized, blank summaries rejected.
//!
//! ## Summarizers
//!
//! [`Summarizer`] is the seam to the language model. [`ChatSummarizer`]
//! talks to any OpenAI-compatible chat completions endpoint with retry and
//! backoff; [`StubSummarizer`] is deterministic and offline.
//!
//! ```rust
//! use std::sync::Arc;
//! use summarize::{DigestOrchestrator, OrchestratorConfig, StubSummarizer};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let orchestrator =
//!     DigestOrchestrator::new(Arc::new(StubSummarizer), OrchestratorConfig::default()).unwrap();
//! let digest = rt.block_on(orchestrator.digest("Rust makes caching safer. Caching matters.")).unwrap();
//! assert_eq!(digest.windows, 0);
//! assert!(!digest.summary.is_empty());
//! ```

mod bullets;
mod chat;
mod config;
mod error;
mod orchestrator;
mod retry;
mod serde_millis;
mod stub;
mod summarizer;
mod window;

pub use crate::bullets::{clean_bullet, normalize_sentiment, normalize_tags, MAX_TAGS};
pub use crate::chat::ChatSummarizer;
pub use crate::config::{ChatConfig, OrchestratorConfig};
pub use crate::error::SummarizeError;
pub use crate::orchestrator::{Digest, DigestOrchestrator};
pub use crate::retry::{retry_with_backoff, RetryConfig, RetryResult};
pub use crate::stub::StubSummarizer;
pub use crate::summarizer::{DigestDraft, Summarizer};
pub use crate::window::{split_windows, Window, WindowConfig};
