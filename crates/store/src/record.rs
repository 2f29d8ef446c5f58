use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Namespace for deriving stable record ids from request ids.
const DIGEST_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2d0e_9a3b_5c47_8e21_d4f0_7b96_a35e);

/// The id a digest for `request_id` is stored under.
///
/// Derived (UUIDv5) rather than random so that a redelivered event lands on
/// the same record.
pub fn digest_id(request_id: &str) -> String {
    Uuid::new_v5(&DIGEST_NAMESPACE, request_id.as_bytes()).to_string()
}

/// A completed digest as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestPayload {
    pub request_id: String,
    pub source_url: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

impl DigestPayload {
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.request_id.trim().is_empty() {
            return Err(StoreError::Invalid("request_id is blank".into()));
        }
        if self.summary.trim().is_empty() {
            return Err(StoreError::Invalid("summary is blank".into()));
        }
        Ok(())
    }
}

/// A persisted digest, one per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDigest {
    pub id: String,
    pub request_id: String,
    pub source_url: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// First write; kept across overwrites.
    pub created_at: DateTime<Utc>,
    /// Latest write.
    pub updated_at: DateTime<Utc>,
}

impl StoredDigest {
    pub(crate) fn from_payload(
        payload: DigestPayload,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: digest_id(&payload.request_id),
            request_id: payload.request_id,
            source_url: payload.source_url,
            summary: payload.summary,
            tags: payload.tags,
            sentiment: payload.sentiment,
            created_at,
            updated_at,
        }
    }
}
