//! Pipeline coordinator.
//!
//! Per request: `Submitted -> TranscriptReady -> DigestCompleted -> Stored`.
//! There is no failure state. A request that fails at any stage is logged
//! and never reaches the store.
//!
//! Settlement rules for consumed events:
//!
//! - success: ack
//! - transient failure (timeouts, transport, broker, store backend): nack,
//!   so the bus redelivers it
//! - permanent failure or undecodable payload: ack, the message is dropped

use std::sync::Arc;

use bus::{DIGESTS_COMPLETED_TOPIC, Delivery, EventBus, InMemoryBus, TRANSCRIPTS_TOPIC};
use ingest::{CaptionSource, FileCaptionSource, YtDlpCaptionSource};
use serde::de::DeserializeOwned;
use store::DigestStore;
use summarize::{ChatSummarizer, DigestOrchestrator, StubSummarizer, Summarizer};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::VdigestConfig;
use crate::pool::{WorkerPool, default_pool_size};
use crate::telemetry::{self, Stage};
use crate::PipelineError;

mod ingestion;
mod processor;
mod results;

pub use self::ingestion::IngestionService;
pub use self::processor::{AI_PROCESSOR_GROUP, DigestProcessor};
pub use self::results::{RESULT_SERVICE_GROUP, ResultConsumer};

fn decode_or_drop<E: DeserializeOwned>(delivery: &Delivery, stage: Stage) -> Option<E> {
    match delivery.decode::<E>() {
        Ok(event) => Some(event),
        Err(err) => {
            telemetry::record_failure(stage, false);
            error!(
                topic = delivery.topic(),
                key = delivery.key(),
                error = %err,
                "event_undecodable"
            );
            None
        }
    }
}

fn settle(delivery: Delivery, outcome: Result<(), PipelineError>, stage: Stage) {
    match outcome {
        Ok(()) => delivery.ack(),
        Err(err) if err.is_transient() => {
            telemetry::record_failure(stage, true);
            warn!(
                stage = stage.as_str(),
                key = delivery.key(),
                attempt = delivery.attempt(),
                error = %err,
                "stage_failed_will_retry"
            );
            delivery.nack();
        }
        Err(err) => {
            telemetry::record_failure(stage, false);
            error!(
                stage = stage.as_str(),
                key = delivery.key(),
                attempt = delivery.attempt(),
                error = %err,
                "stage_failed_dropped"
            );
            delivery.ack();
        }
    }
}

/// External collaborators the pipeline runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn CaptionSource>,
    pub summarizer: Arc<dyn Summarizer>,
    pub bus: Arc<dyn EventBus>,
    pub store: DigestStore,
}

impl Collaborators {
    /// Builds the shipped implementations selected by `config`.
    pub fn from_config(config: &VdigestConfig) -> Result<Self, PipelineError> {
        let source: Arc<dyn CaptionSource> = match config.ingestion.source.as_str() {
            "file" => match &config.ingestion.file_root {
                Some(root) => Arc::new(FileCaptionSource::with_root(root)),
                None => Arc::new(FileCaptionSource::new()),
            },
            _ => Arc::new(YtDlpCaptionSource::new(config.ingestion.to_ytdlp_config())),
        };
        let summarizer: Arc<dyn Summarizer> = match config.summarizer.provider.as_str() {
            "stub" => Arc::new(StubSummarizer),
            _ => Arc::new(ChatSummarizer::new(config.summarizer.chat.clone())?),
        };
        let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new(config.bus.to_bus_config()));
        let store = DigestStore::from_config(&config.store.to_backend_config())?;

        Ok(Self {
            source,
            summarizer,
            bus,
            store,
        })
    }
}

/// A running pipeline: one ingestion service plus consumer loops for the
/// digest processor and the result consumer, all on one bus and store.
pub struct Pipeline {
    ingestion: IngestionService,
    bus: Arc<dyn EventBus>,
    store: DigestStore,
    consumers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Subscribes every consumer group before returning, so no event
    /// published afterwards is missed.
    pub async fn start(
        config: &VdigestConfig,
        collaborators: Collaborators,
    ) -> Result<Self, PipelineError> {
        let Collaborators {
            source,
            summarizer,
            bus,
            store,
        } = collaborators;

        let orchestrator =
            DigestOrchestrator::new(summarizer, config.windowing.to_orchestrator_config())?;
        let pool = WorkerPool::new(config.ingestion.workers.unwrap_or_else(default_pool_size));
        let ingestion = IngestionService::new(
            source,
            bus.clone(),
            pool,
            config.captions,
            config.ingestion.acquire_timeout(),
        );

        let processor = DigestProcessor::new(orchestrator, bus.clone());
        let results = ResultConsumer::new(store.clone());
        let per_role = config.bus.consumers_per_role.max(1);
        let mut consumers = Vec::with_capacity(per_role * 2);
        for _ in 0..per_role {
            let subscription = bus.subscribe(TRANSCRIPTS_TOPIC, AI_PROCESSOR_GROUP).await?;
            consumers.push(tokio::spawn(processor.clone().run(subscription)));

            let subscription = bus
                .subscribe(DIGESTS_COMPLETED_TOPIC, RESULT_SERVICE_GROUP)
                .await?;
            consumers.push(tokio::spawn(results.clone().run(subscription)));
        }

        info!(
            workers = ingestion.pool().size(),
            consumers_per_role = per_role,
            "pipeline_started"
        );
        Ok(Self {
            ingestion,
            bus,
            store,
            consumers,
        })
    }

    /// Builds the configured collaborators and starts the pipeline.
    pub async fn from_config(config: &VdigestConfig) -> Result<Self, PipelineError> {
        let collaborators = Collaborators::from_config(config)?;
        Self::start(config, collaborators).await
    }

    /// See [`IngestionService::enqueue`].
    pub fn enqueue(&self, source_url: &str) -> Result<String, PipelineError> {
        self.ingestion.enqueue(source_url)
    }

    pub fn ingestion(&self) -> &IngestionService {
        &self.ingestion
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &DigestStore {
        &self.store
    }

    /// Waits for queued ingestion jobs, then stops the consumer loops.
    /// Deliveries interrupted by the stop are redelivered by the bus.
    pub async fn shutdown(self) {
        self.ingestion.pool().wait_idle().await;
        for consumer in &self.consumers {
            consumer.abort();
        }
        for consumer in self.consumers {
            let _ = consumer.await;
        }
        info!("pipeline_stopped");
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ingestion", &self.ingestion)
            .field("consumers", &self.consumers.len())
            .finish_non_exhaustive()
    }
}
