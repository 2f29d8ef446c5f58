use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SummarizeError;
use crate::retry::RetryConfig;
use crate::window::WindowConfig;

/// Controls how the orchestrator drives a [`Summarizer`](crate::Summarizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub window: WindowConfig,
    /// Window summaries in flight at once for a single transcript.
    pub max_concurrent_windows: usize,
    /// Budget for each individual summarizer call.
    #[serde(with = "crate::serde_millis")]
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            max_concurrent_windows: 4,
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), SummarizeError> {
        self.window.validate()?;
        if self.max_concurrent_windows == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max_concurrent_windows must be >= 1".into(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(SummarizeError::InvalidConfig(
                "call_timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for [`ChatSummarizer`](crate::ChatSummarizer), an OpenAI-compatible
/// chat completions client.
///
/// # Example
/// ```no_run
/// use summarize::{ChatConfig, ChatSummarizer};
///
/// let cfg = ChatConfig {
///     base_url: "https://api.openai.com/v1".into(),
///     model: "gpt-4o-mini".into(),
///     ..Default::default()
/// };
/// let summarizer = ChatSummarizer::new(cfg).expect("OPENAI_API_KEY is set");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
    pub temperature: f32,
    /// Completion budget per call. `None` leaves it to the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// HTTP timeout for one request attempt.
    #[serde(with = "crate::serde_millis")]
    pub request_timeout: Duration,
    /// Ask for a `sentiment` field in the digest JSON.
    pub request_sentiment: bool,
    pub retry: RetryConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.2,
            max_tokens: None,
            request_timeout: Duration::from_secs(60),
            request_sentiment: false,
            retry: RetryConfig::default(),
        }
    }
}

impl ChatConfig {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
