use std::sync::Arc;
use std::time::Instant;

use bus::{Delivery, DigestCompleted, EventBus, Subscription, TranscriptReady, publish_event};
use summarize::DigestOrchestrator;
use tracing::{Instrument, info};

use super::{decode_or_drop, settle};
use crate::telemetry::{self, Stage};
use crate::PipelineError;

/// Consumer group for transcript digesting.
pub const AI_PROCESSOR_GROUP: &str = "ai-processor";

/// Turns `TranscriptReady` events into `DigestCompleted` events.
#[derive(Clone)]
pub struct DigestProcessor {
    orchestrator: DigestOrchestrator,
    bus: Arc<dyn EventBus>,
}

impl DigestProcessor {
    pub fn new(orchestrator: DigestOrchestrator, bus: Arc<dyn EventBus>) -> Self {
        Self { orchestrator, bus }
    }

    /// Digests one transcript and publishes the result. Nothing is published
    /// on failure.
    pub async fn handle(&self, event: &TranscriptReady) -> Result<DigestCompleted, PipelineError> {
        let started = Instant::now();
        let digest = self.orchestrator.digest(&event.transcript).await?;

        let completed = DigestCompleted {
            request_id: event.request_id.clone(),
            source_url: event.source_url.clone(),
            summary: digest.summary,
            tags: digest.tags,
            sentiment: digest.sentiment,
        };
        publish_event(self.bus.as_ref(), &completed).await?;

        telemetry::record_success(Stage::Digest, started.elapsed());
        info!(
            request_id = %completed.request_id,
            windows = digest.windows,
            tags = completed.tags.len(),
            elapsed_micros = started.elapsed().as_micros() as u64,
            "digest_completed"
        );
        Ok(completed)
    }

    /// Consumes deliveries until the subscription ends.
    pub async fn run(self, mut subscription: Subscription) {
        while let Some(delivery) = subscription.next().await {
            self.process(delivery).await;
        }
    }

    async fn process(&self, delivery: Delivery) {
        let Some(event) = decode_or_drop::<TranscriptReady>(&delivery, Stage::Digest) else {
            delivery.ack();
            return;
        };
        let span = tracing::info_span!(
            "digest.process",
            request_id = %event.request_id,
            attempt = delivery.attempt()
        );
        let outcome = self.handle(&event).instrument(span).await.map(|_| ());
        settle(delivery, outcome, Stage::Digest);
    }
}

impl std::fmt::Debug for DigestProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestProcessor")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}
