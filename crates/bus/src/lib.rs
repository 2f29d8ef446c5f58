//! Event bus between the digest pipeline stages.
//!
//! Stages never call each other directly. Ingestion publishes
//! [`TranscriptReady`] on [`TRANSCRIPTS_TOPIC`], the digest processor
//! consumes it and publishes [`DigestCompleted`] on
//! [`DIGESTS_COMPLETED_TOPIC`], and the result consumer persists that.
//!
//! ## Delivery contract
//!
//! - At-least-once: a [`Delivery`] that is nacked, or dropped unsettled, is
//!   delivered again with `attempt` incremented. Consumers must be idempotent.
//! - Consumer groups: every group subscribed to a topic sees every message;
//!   members of one group share the work.
//! - Ordering per key: messages with the same key reach a group in publish
//!   order, one at a time.
//! - Poison messages are dead-lettered after `max_deliveries`.
//!
//! [`InMemoryBus`] implements this in-process. Other brokers plug in behind
//! [`EventBus`].

use async_trait::async_trait;
use bytes::Bytes;

mod delivery;
mod error;
mod event;
mod memory;

pub use crate::delivery::{
    Acknowledger, Delivery, DeliveryStream, Message, Settlement, Subscription,
};
pub use crate::error::BusError;
pub use crate::event::{
    DigestCompleted, Event, TranscriptReady, DIGESTS_COMPLETED_TOPIC, TRANSCRIPTS_TOPIC,
};
pub use crate::memory::{BusConfig, DeadLetter, InMemoryBus};

/// A keyed publish/subscribe transport.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), BusError>;

    /// Joins `group` on `topic`, creating the group if needed.
    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, BusError>;
}

/// Serializes `event` as JSON and publishes it on its topic, keyed by
/// [`Event::key`].
pub async fn publish_event<E: Event>(bus: &dyn EventBus, event: &E) -> Result<(), BusError> {
    let payload = Bytes::from(serde_json::to_vec(event)?);
    bus.publish(E::TOPIC, event.key(), payload).await
}
