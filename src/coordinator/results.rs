use std::time::Instant;

use bus::{Delivery, DigestCompleted, Subscription};
use store::{DigestPayload, DigestStore, StoreError, StoredDigest};
use tracing::{Instrument, info};

use super::{decode_or_drop, settle};
use crate::telemetry::{self, Stage};
use crate::PipelineError;

/// Consumer group for result persistence.
pub const RESULT_SERVICE_GROUP: &str = "result-service";

/// Persists `DigestCompleted` events, one record per request.
#[derive(Clone, Debug)]
pub struct ResultConsumer {
    store: DigestStore,
}

impl ResultConsumer {
    pub fn new(store: DigestStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DigestStore {
        &self.store
    }

    /// Upserts the digest by `request_id`. Safe to repeat.
    pub async fn handle(&self, event: DigestCompleted) -> Result<StoredDigest, PipelineError> {
        let started = Instant::now();
        let payload = DigestPayload {
            request_id: event.request_id,
            source_url: event.source_url,
            summary: event.summary,
            tags: event.tags,
            sentiment: event.sentiment,
        };

        // redb commits synchronously.
        let store = self.store.clone();
        let stored = tokio::task::spawn_blocking(move || store.upsert(payload))
            .await
            .map_err(StoreError::backend)??;

        telemetry::record_success(Stage::Store, started.elapsed());
        info!(
            request_id = %stored.request_id,
            id = %stored.id,
            elapsed_micros = started.elapsed().as_micros() as u64,
            "result_persisted"
        );
        Ok(stored)
    }

    /// Consumes deliveries until the subscription ends.
    pub async fn run(self, mut subscription: Subscription) {
        while let Some(delivery) = subscription.next().await {
            self.process(delivery).await;
        }
    }

    async fn process(&self, delivery: Delivery) {
        let Some(event) = decode_or_drop::<DigestCompleted>(&delivery, Stage::Store) else {
            delivery.ack();
            return;
        };
        let span = tracing::info_span!(
            "digest.store",
            request_id = %event.request_id,
            attempt = delivery.attempt()
        );
        let outcome = self.handle(event).instrument(span).await.map(|_| ());
        settle(delivery, outcome, Stage::Store);
    }
}
