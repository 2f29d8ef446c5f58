//! Events exchanged between pipeline stages.
//!
//! Payloads travel as camelCase JSON and every event is keyed by its
//! `request_id`, so all events for one request land on the same partition
//! and are seen in order by a consumer group.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Topic carrying normalized transcripts from ingestion to digesting.
pub const TRANSCRIPTS_TOPIC: &str = "video.transcripts";
/// Topic carrying finished digests to the result store.
pub const DIGESTS_COMPLETED_TOPIC: &str = "video.digests.completed";

/// A typed event bound to one topic.
pub trait Event: Serialize + DeserializeOwned + Send + Sync {
    const TOPIC: &'static str;

    /// Partition key; the request id for every pipeline event.
    fn key(&self) -> &str;
}

/// A caption document was acquired and normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptReady {
    pub request_id: String,
    pub source_url: String,
    pub transcript: String,
}

impl Event for TranscriptReady {
    const TOPIC: &'static str = TRANSCRIPTS_TOPIC;

    fn key(&self) -> &str {
        &self.request_id
    }
}

/// A digest was produced for a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestCompleted {
    pub request_id: String,
    pub source_url: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

impl Event for DigestCompleted {
    const TOPIC: &'static str = DIGESTS_COMPLETED_TOPIC;

    fn key(&self) -> &str {
        &self.request_id
    }
}
