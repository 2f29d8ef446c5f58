//! End-to-end runs through ingestion, digesting and persistence on an
//! in-process bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use vdigest::bus::{DigestCompleted, InMemoryBus, publish_event};
use vdigest::ingest::FileCaptionSource;
use vdigest::store::DigestStore;
use vdigest::summarize::{DigestDraft, StubSummarizer, SummarizeError, Summarizer};
use vdigest::{Collaborators, Pipeline, PollConfig, PollOutcome, VdigestConfig, poll_for_digest};

const TALK: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n\
STYLE\n::cue { color: white }\n\n\
1\n00:00:01.000 --> 00:00:04.000 align:start position:0%\n\
<c.colorE5E5E5>Welcome</c> to the <b>rust</b> systems talk\n\n\
2\n00:00:04.000 --> 00:00:08.000\ntoday we cover ownership &amp; borrowing\n";

fn fast_poll() -> PollConfig {
    PollConfig {
        initial_delay: Duration::ZERO,
        interval: Duration::from_millis(20),
        max_attempts: 250,
    }
}

fn captions_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        std::fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

async fn start(
    config: &VdigestConfig,
    dir: &TempDir,
    summarizer: Arc<dyn Summarizer>,
) -> Pipeline {
    let collaborators = Collaborators {
        source: Arc::new(FileCaptionSource::with_root(dir.path())),
        summarizer,
        bus: Arc::new(InMemoryBus::default()),
        store: DigestStore::in_memory(),
    };
    Pipeline::start(config, collaborators).await.unwrap()
}

#[tokio::test]
async fn url_to_stored_digest() {
    let dir = captions_dir(&[("talk.vtt", TALK)]);
    let pipeline = start(&VdigestConfig::default(), &dir, Arc::new(StubSummarizer)).await;

    let request_id = pipeline.enqueue("talk.vtt").unwrap();
    let PollOutcome::Found(digest) = poll_for_digest(&pipeline, &request_id, &fast_poll()).await
    else {
        panic!("digest was not stored");
    };

    assert_eq!(digest.request_id, request_id);
    assert_eq!(digest.source_url, "talk.vtt");
    assert!(digest.summary.starts_with("Welcome to the rust systems talk"));
    assert!(digest.summary.contains("ownership & borrowing"));
    assert!(!digest.summary.contains('<'));
    assert!(digest.tags.iter().all(|t| *t == t.to_lowercase()));
    assert_eq!(pipeline.store().find_by_id(&digest.id).unwrap(), Some(digest));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn captions_without_speech_store_nothing() {
    let header_only = "WEBVTT\nKind: captions\nLanguage: en\n\nSTYLE\n::cue { color: white }\n";
    let dir = captions_dir(&[("silent.vtt", header_only)]);
    let pipeline = start(&VdigestConfig::default(), &dir, Arc::new(StubSummarizer)).await;

    let request_id = pipeline.enqueue("silent.vtt").unwrap();
    pipeline.ingestion().pool().wait_idle().await;

    let poll = PollConfig {
        initial_delay: Duration::from_millis(50),
        interval: Duration::from_millis(10),
        max_attempts: 5,
    };
    let outcome = poll_for_digest(&pipeline, &request_id, &poll).await;
    assert_eq!(outcome, PollOutcome::GaveUp { attempts: 5 });
    assert!(pipeline.store().list().unwrap().is_empty());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn duplicate_completion_keeps_one_record() {
    let dir = captions_dir(&[]);
    let pipeline = start(&VdigestConfig::default(), &dir, Arc::new(StubSummarizer)).await;

    let event = DigestCompleted {
        request_id: "req-dup".into(),
        source_url: "https://youtu.be/abc".into(),
        summary: "A short talk.".into(),
        tags: vec!["rust".into()],
        sentiment: None,
    };
    publish_event(pipeline.bus().as_ref(), &event).await.unwrap();
    publish_event(pipeline.bus().as_ref(), &event).await.unwrap();

    let PollOutcome::Found(first) = poll_for_digest(&pipeline, "req-dup", &fast_poll()).await
    else {
        panic!("digest was not stored");
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let all = pipeline.store().list().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, first.id);
    assert_eq!(all[0].created_at, first.created_at);

    pipeline.shutdown().await;
}

/// Counts chunk calls and digests whatever it is handed.
#[derive(Default)]
struct Counting {
    chunks: AtomicUsize,
    digests: AtomicUsize,
}

#[async_trait]
impl Summarizer for Counting {
    async fn summarize_chunk(&self, index: usize, _text: &str) -> Result<Vec<String>, SummarizeError> {
        self.chunks.fetch_add(1, Ordering::SeqCst);
        Ok(vec![format!("- point from window {index}")])
    }

    async fn produce_digest(&self, text: &str) -> Result<DigestDraft, SummarizeError> {
        self.digests.fetch_add(1, Ordering::SeqCst);
        Ok(DigestDraft {
            summary: format!("{} bullet lines", text.lines().count()),
            tags: vec!["Long".into(), "long".into()],
            sentiment: Some("neutral".into()),
        })
    }
}

#[tokio::test]
async fn long_transcript_is_windowed() {
    let mut long = String::from("WEBVTT\n\n");
    for i in 0..60 {
        long.push_str(&format!(
            "00:00:{:02}.000 --> 00:00:{:02}.500\nsentence number {i} of a rather long lecture\n\n",
            i % 60,
            i % 60
        ));
    }
    let dir = captions_dir(&[("long.vtt", &long)]);

    let mut config = VdigestConfig::default();
    config.windowing.single_pass_limit = 500;
    config.windowing.window_size = 400;
    config.windowing.overlap = 50;
    let counting = Arc::new(Counting::default());
    let pipeline = start(&config, &dir, counting.clone()).await;

    let request_id = pipeline.enqueue("long.vtt").unwrap();
    let PollOutcome::Found(digest) = poll_for_digest(&pipeline, &request_id, &fast_poll()).await
    else {
        panic!("digest was not stored");
    };

    let chunks = counting.chunks.load(Ordering::SeqCst);
    assert!(chunks > 1, "expected several windows, got {chunks}");
    assert_eq!(counting.digests.load(Ordering::SeqCst), 1);
    assert_eq!(digest.summary, format!("{chunks} bullet lines"));
    assert_eq!(digest.tags, vec!["long".to_string()]);
    assert_eq!(digest.sentiment.as_deref(), Some("neutral"));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn poll_schedule_comes_from_yaml() {
    let dir = captions_dir(&[("talk.vtt", TALK)]);
    let config = VdigestConfig::from_yaml(
        r#"
version: "1.0"
summarizer:
  provider: "stub"
poll:
  initial_delay_ms: 0
  interval_ms: 20
  max_attempts: 250
"#,
    )
    .unwrap();
    let poll = config.poll.to_poll_config();
    assert_eq!(poll, fast_poll());

    let pipeline = start(&config, &dir, Arc::new(StubSummarizer)).await;
    let request_id = pipeline.enqueue("talk.vtt").unwrap();
    let outcome = poll_for_digest(&pipeline, &request_id, &poll).await;
    assert!(matches!(outcome, PollOutcome::Found(ref d) if d.request_id == request_id));

    pipeline.shutdown().await;
}
