//! Chunk-then-reduce digest orchestration.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use captions::collapse_whitespace;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bullets::{clean_bullet, normalize_sentiment, normalize_tags};
use crate::config::OrchestratorConfig;
use crate::error::SummarizeError;
use crate::summarizer::{DigestDraft, Summarizer};
use crate::window::{split_windows, Window};

/// Cleaned digest ready to be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub summary: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Windows summarized before the final pass; zero for single-pass digests.
    #[serde(default)]
    pub windows: usize,
}

/// Drives a [`Summarizer`] over a transcript.
///
/// Transcripts within the single-pass budget go straight to
/// `produce_digest`. Longer ones are split into overlapping windows that are
/// summarized concurrently, and the cleaned bullets, in window order, feed a
/// final `produce_digest` call.
#[derive(Clone)]
pub struct DigestOrchestrator {
    summarizer: Arc<dyn Summarizer>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for DigestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestOrchestrator")
            .field("summarizer", &self.summarizer.name())
            .field("config", &self.config)
            .finish()
    }
}

impl DigestOrchestrator {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        config: OrchestratorConfig,
    ) -> Result<Self, SummarizeError> {
        config.validate()?;
        Ok(Self { summarizer, config })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn digest(&self, transcript: &str) -> Result<Digest, SummarizeError> {
        let started = Instant::now();
        let text = collapse_whitespace(transcript);
        if text.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }
        let char_len = text.chars().count();

        let (draft, windows) = if char_len <= self.config.window.single_pass_limit {
            (self.call(self.summarizer.produce_digest(&text)).await?, 0)
        } else {
            let windows = split_windows(&text, &self.config.window);
            let count = windows.len();
            let bullets = self.summarize_windows(windows).await?;
            debug!(windows = count, bullets = bullets.len(), "windows_aggregated");
            let aggregate = bullets.join("\n");
            (
                self.call(self.summarizer.produce_digest(&aggregate)).await?,
                count,
            )
        };

        let digest = finalize(draft, windows)?;
        info!(
            summarizer = self.summarizer.name(),
            transcript_chars = char_len,
            windows,
            tags = digest.tags.len(),
            elapsed_micros = started.elapsed().as_micros() as u64,
            "digest_produced"
        );
        Ok(digest)
    }

    /// Bullets of every window, concatenated in window order. Fails on the
    /// first window that errors or yields nothing usable.
    async fn summarize_windows(
        &self,
        windows: Vec<Window>,
    ) -> Result<Vec<String>, SummarizeError> {
        let jobs = windows.into_iter().map(|window| {
            let this = self.clone();
            async move { this.summarize_window(&window).await }
        });
        let per_window: Vec<Vec<String>> = stream::iter(jobs)
            .buffered(self.config.max_concurrent_windows)
            .try_collect()
            .await?;
        Ok(per_window.into_iter().flatten().collect())
    }

    async fn summarize_window(&self, window: &Window) -> Result<Vec<String>, SummarizeError> {
        let raw = self
            .call(self.summarizer.summarize_chunk(window.index, &window.text))
            .await?;
        let bullets: Vec<String> = raw
            .iter()
            .flat_map(|line| line.lines())
            .filter_map(clean_bullet)
            .collect();
        if bullets.is_empty() {
            return Err(SummarizeError::EmptyChunkSummary {
                index: window.index,
            });
        }
        debug!(
            window = window.index,
            start = window.start,
            end = window.end,
            bullets = bullets.len(),
            "window_summarized"
        );
        Ok(bullets)
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, SummarizeError>>,
    ) -> Result<T, SummarizeError> {
        let budget = self.config.call_timeout;
        tokio::time::timeout(budget, fut)
            .await
            .map_err(|_| SummarizeError::Timeout(budget))?
    }
}

fn finalize(draft: DigestDraft, windows: usize) -> Result<Digest, SummarizeError> {
    let summary = draft.summary.trim();
    if summary.is_empty() {
        return Err(SummarizeError::Malformed("digest summary is empty".into()));
    }
    Ok(Digest {
        summary: summary.to_owned(),
        tags: normalize_tags(&draft.tags),
        sentiment: normalize_sentiment(draft.sentiment.as_deref()),
        windows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every call; later windows answer faster than earlier ones.
    #[derive(Default)]
    struct RecordingSummarizer {
        chunk_calls: Mutex<Vec<(usize, usize)>>,
        digest_inputs: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        empty_chunk: Option<usize>,
        summary: Option<String>,
        digest_delay: Option<Duration>,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn summarize_chunk(
            &self,
            index: usize,
            text: &str,
        ) -> Result<Vec<String>, SummarizeError> {
            self.chunk_calls
                .lock()
                .unwrap()
                .push((index, text.chars().count()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5 * (6 - index.min(5)) as u64)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.empty_chunk == Some(index) {
                return Ok(vec!["".into(), " - ".into(), "3.".into()]);
            }
            Ok(vec![
                format!("- chunk {index} first"),
                String::new(),
                format!("2. chunk {index} second"),
            ])
        }

        async fn produce_digest(&self, text: &str) -> Result<DigestDraft, SummarizeError> {
            if let Some(delay) = self.digest_delay {
                tokio::time::sleep(delay).await;
            }
            self.digest_inputs.lock().unwrap().push(text.to_owned());
            Ok(DigestDraft {
                summary: self
                    .summary
                    .clone()
                    .unwrap_or_else(|| "  A digest.  ".into()),
                tags: vec!["Tech".into(), " tech ".into(), "AI".into(), "".into(), "ai".into()],
                sentiment: Some(" Positive ".into()),
            })
        }
    }

    fn alphabet_text(len: usize) -> String {
        (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
    }

    fn orchestrator(summarizer: Arc<RecordingSummarizer>) -> DigestOrchestrator {
        DigestOrchestrator::new(summarizer, OrchestratorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn short_transcript_is_single_pass() {
        let summarizer = Arc::new(RecordingSummarizer::default());
        let digest = orchestrator(summarizer.clone())
            .digest("  a short\n transcript  ")
            .await
            .unwrap();

        assert!(summarizer.chunk_calls.lock().unwrap().is_empty());
        assert_eq!(
            *summarizer.digest_inputs.lock().unwrap(),
            vec!["a short transcript".to_string()]
        );
        assert_eq!(digest.summary, "A digest.");
        assert_eq!(digest.tags, vec!["tech", "ai"]);
        assert_eq!(digest.sentiment.as_deref(), Some("positive"));
        assert_eq!(digest.windows, 0);
    }

    #[tokio::test]
    async fn long_transcript_aggregates_in_window_order() {
        let summarizer = Arc::new(RecordingSummarizer::default());
        let digest = orchestrator(summarizer.clone())
            .digest(&alphabet_text(20_000))
            .await
            .unwrap();

        let mut calls = summarizer.chunk_calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![(0, 5_000), (1, 5_000), (2, 5_000), (3, 5_000), (4, 1_600)]
        );

        let expected: Vec<String> = (0..5)
            .flat_map(|i| [format!("chunk {i} first"), format!("chunk {i} second")])
            .collect();
        assert_eq!(
            *summarizer.digest_inputs.lock().unwrap(),
            vec![expected.join("\n")]
        );
        assert_eq!(digest.windows, 5);
    }

    #[tokio::test]
    async fn window_concurrency_is_bounded() {
        let summarizer = Arc::new(RecordingSummarizer::default());
        let cfg = OrchestratorConfig {
            max_concurrent_windows: 2,
            ..Default::default()
        };
        DigestOrchestrator::new(summarizer.clone(), cfg)
            .unwrap()
            .digest(&alphabet_text(20_000))
            .await
            .unwrap();

        let peak = summarizer.max_in_flight.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency {peak}");
    }

    #[tokio::test]
    async fn unusable_chunk_fails_the_request() {
        let summarizer = Arc::new(RecordingSummarizer {
            empty_chunk: Some(2),
            ..Default::default()
        });
        let err = orchestrator(summarizer.clone())
            .digest(&alphabet_text(20_000))
            .await
            .unwrap_err();

        assert_eq!(err, SummarizeError::EmptyChunkSummary { index: 2 });
        assert!(summarizer.digest_inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_summary_is_malformed() {
        let summarizer = Arc::new(RecordingSummarizer {
            summary: Some("   ".into()),
            ..Default::default()
        });
        let err = orchestrator(summarizer).digest("hello").await.unwrap_err();
        assert!(matches!(err, SummarizeError::Malformed(_)));
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let summarizer = Arc::new(RecordingSummarizer {
            digest_delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        let cfg = OrchestratorConfig {
            call_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let err = DigestOrchestrator::new(summarizer, cfg)
            .unwrap()
            .digest("hello")
            .await
            .unwrap_err();
        assert_eq!(err, SummarizeError::Timeout(Duration::from_millis(20)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn whitespace_only_input_is_rejected() {
        let summarizer = Arc::new(RecordingSummarizer::default());
        let err = orchestrator(summarizer).digest(" \n\t ").await.unwrap_err();
        assert_eq!(err, SummarizeError::EmptyInput);
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let cfg = OrchestratorConfig {
            max_concurrent_windows: 0,
            ..Default::default()
        };
        assert!(DigestOrchestrator::new(Arc::new(RecordingSummarizer::default()), cfg).is_err());
    }
}
