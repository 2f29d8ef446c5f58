use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::SummarizeError;
use crate::summarizer::{DigestDraft, Summarizer};

const WORDS_PER_BULLET: usize = 12;
const MAX_BULLETS: usize = 8;
const SUMMARY_WORDS: usize = 40;
const MIN_TAG_LEN: usize = 5;
const STUB_TAGS: usize = 5;

/// Deterministic offline summarizer.
///
/// Bullets are leading word runs of the window, the summary is the opening of
/// the text and tags are its most frequent longer words. Used when no model
/// endpoint is configured and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubSummarizer;

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize_chunk(
        &self,
        _index: usize,
        text: &str,
    ) -> Result<Vec<String>, SummarizeError> {
        let words: Vec<&str> = text.split_whitespace().collect();
        Ok(words
            .chunks(WORDS_PER_BULLET)
            .take(MAX_BULLETS)
            .map(|chunk| format!("- {}", chunk.join(" ")))
            .collect())
    }

    async fn produce_digest(&self, text: &str) -> Result<DigestDraft, SummarizeError> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut summary = words
            .iter()
            .take(SUMMARY_WORDS)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if words.len() > SUMMARY_WORDS {
            summary.push_str(" ...");
        }
        Ok(DigestDraft {
            summary,
            tags: frequent_words(&words),
            sentiment: None,
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Most frequent alphabetic words, ties broken by first appearance.
fn frequent_words(words: &[&str]) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in words.iter().enumerate() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        if word.chars().count() < MIN_TAG_LEN || !word.chars().any(char::is_alphabetic) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(STUB_TAGS)
        .map(|(word, _, _)| word)
        .collect()
}
