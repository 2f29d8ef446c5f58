use std::sync::Arc;
use std::time::{Duration, Instant};

use bus::{EventBus, TranscriptReady, publish_event};
use captions::{NormalizeConfig, normalize_captions_with};
use ingest::{AcquisitionError, CaptionSource, DigestRequest};
use tracing::{Instrument, debug, info, warn};

use crate::pool::WorkerPool;
use crate::telemetry::{self, Stage};
use crate::PipelineError;

/// Entry point of the pipeline: request id assignment, caption acquisition,
/// normalization and the `TranscriptReady` publish.
#[derive(Clone)]
pub struct IngestionService {
    source: Arc<dyn CaptionSource>,
    bus: Arc<dyn EventBus>,
    pool: WorkerPool,
    normalize: NormalizeConfig,
    acquire_timeout: Duration,
}

impl IngestionService {
    pub fn new(
        source: Arc<dyn CaptionSource>,
        bus: Arc<dyn EventBus>,
        pool: WorkerPool,
        normalize: NormalizeConfig,
        acquire_timeout: Duration,
    ) -> Self {
        Self {
            source,
            bus,
            pool,
            normalize,
            acquire_timeout,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Accepts `source_url` and returns its request id right away.
    ///
    /// The acquisition job runs on the worker pool. If it fails the failure
    /// is logged and nothing is published. Only a malformed URL is reported
    /// here. Must be called from within a tokio runtime.
    pub fn enqueue(&self, source_url: &str) -> Result<String, PipelineError> {
        let request = DigestRequest::new(source_url)?;
        let request_id = request.request_id.clone();
        let span = tracing::info_span!("digest.ingest", request_id = %request_id);

        let this = self.clone();
        self.pool.spawn(
            async move {
                if let Err(err) = this.ingest(&request).await {
                    telemetry::record_failure(Stage::Ingest, err.is_transient());
                    warn!(
                        source_url = %request.source_url,
                        error = %err,
                        transient = err.is_transient(),
                        "ingest_failed"
                    );
                }
            }
            .instrument(span),
        );
        debug!(request_id = %request_id, pending = self.pool.pending(), "ingest_enqueued");
        Ok(request_id)
    }

    /// Runs one acquisition job to completion.
    pub async fn ingest(&self, request: &DigestRequest) -> Result<TranscriptReady, PipelineError> {
        let started = Instant::now();

        let raw = tokio::time::timeout(self.acquire_timeout, self.source.acquire(&request.source_url))
            .await
            .map_err(|_| AcquisitionError::Timeout(self.acquire_timeout))??;

        let (transcript, _) = normalize_captions_with(&raw, &self.normalize)?;

        let event = TranscriptReady {
            request_id: request.request_id.clone(),
            source_url: request.source_url.clone(),
            transcript: transcript.into_string(),
        };
        publish_event(self.bus.as_ref(), &event).await?;

        telemetry::record_success(Stage::Ingest, started.elapsed());
        info!(
            request_id = %event.request_id,
            source = self.source.name(),
            transcript_chars = event.transcript.chars().count(),
            elapsed_micros = started.elapsed().as_micros() as u64,
            "ingest_success"
        );
        Ok(event)
    }
}

impl std::fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionService")
            .field("source", &self.source.name())
            .field("pool", &self.pool)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bus::{InMemoryBus, TRANSCRIPTS_TOPIC};

    struct FixedSource(&'static str);

    #[async_trait]
    impl CaptionSource for FixedSource {
        async fn acquire(&self, _source_url: &str) -> Result<String, AcquisitionError> {
            Ok(self.0.to_string())
        }
    }

    struct SlowSource;

    #[async_trait]
    impl CaptionSource for SlowSource {
        async fn acquire(&self, _source_url: &str) -> Result<String, AcquisitionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nlate\n".into())
        }
    }

    fn service(source: Arc<dyn CaptionSource>, bus: Arc<InMemoryBus>) -> IngestionService {
        IngestionService::new(
            source,
            bus,
            WorkerPool::new(2),
            NormalizeConfig::default(),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn publishes_normalized_transcript() {
        let bus = Arc::new(InMemoryBus::default());
        let mut sub = bus.subscribe(TRANSCRIPTS_TOPIC, "test").await.unwrap();
        let svc = service(
            Arc::new(FixedSource(
                "WEBVTT\n\n1\n00:00:00.000 --> 00:00:02.000\n<c>Hello</c> &amp; welcome\n",
            )),
            bus.clone(),
        );

        let request_id = svc.enqueue("https://youtu.be/abc").unwrap();
        svc.pool().wait_idle().await;

        let delivery = sub.next().await.unwrap();
        let event: TranscriptReady = delivery.decode().unwrap();
        assert_eq!(event.request_id, request_id);
        assert_eq!(delivery.key(), request_id);
        assert_eq!(event.transcript, "Hello & welcome");
        delivery.ack();
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn normalization_is_logged_once_per_request() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let bus = Arc::new(InMemoryBus::default());
        let svc = service(
            Arc::new(FixedSource("WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nhello\n")),
            bus,
        );
        let request = DigestRequest::new("https://youtu.be/abc").unwrap();
        svc.ingest(&request).await.unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("captions_normalized").count(), 1, "{output}");
    }

    #[tokio::test]
    async fn metadata_only_captions_publish_nothing() {
        let bus = Arc::new(InMemoryBus::default());
        let svc = service(
            Arc::new(FixedSource("WEBVTT\n\nSTYLE\n::cue { color: red }\n")),
            bus.clone(),
        );
        let request = DigestRequest::new("https://youtu.be/abc").unwrap();

        let err = svc.ingest(&request).await.unwrap_err();
        assert_eq!(err, PipelineError::Captions(captions::CaptionError::EmptyTranscript));

        svc.enqueue("https://youtu.be/abc").unwrap();
        svc.pool().wait_idle().await;
        let mut sub = bus.subscribe(TRANSCRIPTS_TOPIC, "test").await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(50), sub.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let bus = Arc::new(InMemoryBus::default());
        let svc = service(Arc::new(SlowSource), bus);
        let request = DigestRequest::new("https://youtu.be/abc").unwrap();

        let err = svc.ingest(&request).await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::Acquisition(AcquisitionError::Timeout(Duration::from_millis(100)))
        );
        assert!(err.is_transient());
    }

    #[test]
    fn blank_url_is_rejected_synchronously() {
        let bus = Arc::new(InMemoryBus::default());
        let svc = service(Arc::new(FixedSource("")), bus);
        let err = svc.enqueue("   ").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Acquisition(AcquisitionError::InvalidSource(_))
        ));
    }
}
