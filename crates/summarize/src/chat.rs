//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ChatConfig;
use crate::error::SummarizeError;
use crate::retry::retry_with_backoff;
use crate::summarizer::{DigestDraft, Summarizer};

// Shared client so every summarizer instance reuses one connection pool.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .build()
        .unwrap_or_default()
});

const CHUNK_INSTRUCTIONS: &str = "Summarize the following transcript chunk into at most 8 concise bullet points.\n\
Use short, factual bullets; no emojis; no markdown; no preface.";

const DIGEST_SYSTEM_PROMPT: &str = "You are an assistant that produces compact digests for video transcripts.\n\
Your response MUST be a single JSON object with this exact schema:\n\
{\n  \"summary\": string,\n  \"tags\": string[]\n}\n\
Do NOT add any extra text, code fences, or commentary.";

const DIGEST_SYSTEM_PROMPT_WITH_SENTIMENT: &str = "You are an assistant that produces compact digests for video transcripts.\n\
Your response MUST be a single JSON object with this exact schema:\n\
{\n  \"summary\": string,\n  \"tags\": string[],\n  \"sentiment\": \"positive\" | \"neutral\" | \"negative\"\n}\n\
Do NOT add any extra text, code fences, or commentary.";

/// [`Summarizer`] backed by a chat completions endpoint.
pub struct ChatSummarizer {
    config: ChatConfig,
    api_key: String,
    url: String,
}

impl std::fmt::Debug for ChatSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSummarizer")
            .field("url", &self.url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl ChatSummarizer {
    /// Reads the API key from the environment variable named by
    /// `config.api_key_env`.
    pub fn new(config: ChatConfig) -> Result<Self, SummarizeError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            SummarizeError::InvalidConfig(format!("API key not found in ${}", config.api_key_env))
        })?;
        Ok(Self::with_api_key(config, api_key))
    }

    pub fn with_api_key(config: ChatConfig, api_key: impl Into<String>) -> Self {
        let url = config.completions_url();
        Self {
            config,
            api_key: api_key.into(),
            url,
        }
    }

    async fn complete(&self, messages: Value) -> Result<String, SummarizeError> {
        let payload = build_payload(&self.config, messages);
        let outcome = retry_with_backoff(
            &self.config.retry,
            SummarizeError::is_transient,
            |attempt| {
                if attempt > 0 {
                    debug!(attempt, model = %self.config.model, "chat_retry");
                }
                self.send(&payload)
            },
        )
        .await;

        if !outcome.succeeded() {
            warn!(
                attempts = outcome.attempts,
                elapsed_ms = outcome.total_duration.as_millis() as u64,
                "chat_request_failed"
            );
        }
        outcome.into_result()
    }

    async fn send(&self, payload: &Value) -> Result<String, SummarizeError> {
        let response = HTTP_CLIENT
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(self.config.request_timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| SummarizeError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| SummarizeError::Malformed(format!("invalid JSON response: {e}")))?;
        extract_content(&value)
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize_chunk(
        &self,
        index: usize,
        text: &str,
    ) -> Result<Vec<String>, SummarizeError> {
        let prompt = format!("{CHUNK_INSTRUCTIONS}\n\nChunk #{}:\n{text}", index + 1);
        let content = self
            .complete(json!([{ "role": "user", "content": prompt }]))
            .await?;
        Ok(content.lines().map(str::to_owned).collect())
    }

    async fn produce_digest(&self, text: &str) -> Result<DigestDraft, SummarizeError> {
        let system = if self.config.request_sentiment {
            DIGEST_SYSTEM_PROMPT_WITH_SENTIMENT
        } else {
            DIGEST_SYSTEM_PROMPT
        };
        let content = self
            .complete(json!([
                { "role": "system", "content": system },
                { "role": "user", "content": format!("Transcript content:\n{text}") },
            ]))
            .await?;
        parse_digest(&content)
    }

    fn name(&self) -> &str {
        "chat"
    }
}

fn build_payload(config: &ChatConfig, messages: Value) -> Value {
    let mut payload = json!({
        "model": config.model,
        "messages": messages,
        "temperature": config.temperature,
    });
    if let Some(max_tokens) = config.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    payload
}

fn classify_status(status: StatusCode, body: &str) -> SummarizeError {
    let message = format!("HTTP error {status}: {body}");
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        SummarizeError::Transport(message)
    } else {
        SummarizeError::Rejected(message)
    }
}

/// Trimmed `choices[0].message.content`. Blank content is returned as is;
/// callers decide whether that is usable.
fn extract_content(value: &Value) -> Result<String, SummarizeError> {
    let content = value["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            SummarizeError::Malformed("response has no choices[0].message.content".into())
        })?;
    Ok(content.trim().to_owned())
}

/// Removes a surrounding Markdown code fence (with optional language tag).
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_digest(content: &str) -> Result<DigestDraft, SummarizeError> {
    let body = strip_code_fences(content);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(SummarizeError::Malformed(
                "digest response contains no JSON object".into(),
            ))
        }
    };
    serde_json::from_str(json)
        .map_err(|e| SummarizeError::Malformed(format!("digest JSON did not match schema: {e}")))
}
