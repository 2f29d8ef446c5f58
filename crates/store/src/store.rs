use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use crate::backend::{BackendConfig, InMemoryBackend, StoreBackend};
use crate::error::StoreError;
use crate::record::{DigestPayload, StoredDigest};

const DIGEST_PREFIX: &str = "digest:";
const REQUEST_PREFIX: &str = "request:";

fn digest_key(id: &str) -> String {
    format!("{DIGEST_PREFIX}{id}")
}

fn request_key(request_id: &str) -> String {
    format!("{REQUEST_PREFIX}{request_id}")
}

/// Digest records keyed by request, with idempotent writes.
///
/// Each record lives under `digest:<id>` and a `request:<request_id>` entry
/// points at the id. Clones share the same backend.
#[derive(Clone)]
pub struct DigestStore {
    backend: Arc<dyn StoreBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl DigestStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, StoreError> {
        Ok(Self::new(config.build()?))
    }

    /// Inserts or overwrites the digest for `payload.request_id`.
    ///
    /// Writing the same request twice leaves one record holding the latest
    /// payload; `created_at` keeps the time of the first write.
    pub fn upsert(&self, payload: DigestPayload) -> Result<StoredDigest, StoreError> {
        payload.validate()?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let now = Utc::now();
        let previous = self.find_by_request_id(&payload.request_id)?;
        let created_at = previous.as_ref().map_or(now, |p| p.created_at);
        let record = StoredDigest::from_payload(payload, created_at, now);

        let bytes = serde_json::to_vec(&record)?;
        self.backend.batch_put(vec![
            (digest_key(&record.id), bytes),
            (
                request_key(&record.request_id),
                record.id.clone().into_bytes(),
            ),
        ])?;

        if previous.is_some() {
            debug!(request_id = %record.request_id, id = %record.id, "digest_overwritten");
        } else {
            info!(request_id = %record.request_id, id = %record.id, "digest_stored");
        }
        Ok(record)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<StoredDigest>, StoreError> {
        self.backend
            .get(&digest_key(id))?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }

    pub fn find_by_request_id(&self, request_id: &str) -> Result<Option<StoredDigest>, StoreError> {
        let Some(id) = self.backend.get(&request_key(request_id))? else {
            return Ok(None);
        };
        let id = String::from_utf8(id).map_err(|e| StoreError::Codec(e.to_string()))?;
        self.find_by_id(&id)
    }

    /// All stored digests, most recently updated first.
    pub fn list(&self) -> Result<Vec<StoredDigest>, StoreError> {
        let mut records = Vec::new();
        self.backend.scan_prefix(DIGEST_PREFIX, &mut |bytes| {
            records.push(serde_json::from_slice::<StoredDigest>(bytes)?);
            Ok(())
        })?;
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }
}

impl std::fmt::Debug for DigestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(request_id: &str, summary: &str, tags: &[&str]) -> DigestPayload {
        DigestPayload {
            request_id: request_id.into(),
            source_url: "https://www.youtube.com/watch?v=abc".into(),
            summary: summary.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            sentiment: None,
        }
    }

    #[test]
    fn duplicate_upsert_keeps_one_record_with_latest_payload() {
        let store = DigestStore::in_memory();
        let first = store.upsert(payload("r-1", "first", &["a"])).unwrap();
        let second = store.upsert(payload("r-1", "second", &["b"])).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].summary, "second");
        assert_eq!(all[0].tags, vec!["b".to_string()]);
    }

    #[test]
    fn found_by_id_and_by_request_id() {
        let store = DigestStore::in_memory();
        let stored = store.upsert(payload("r-2", "sum", &[])).unwrap();

        assert_eq!(store.find_by_id(&stored.id).unwrap(), Some(stored.clone()));
        assert_eq!(store.find_by_request_id("r-2").unwrap(), Some(stored));
        assert_eq!(store.find_by_request_id("missing").unwrap(), None);
        assert_eq!(store.find_by_id("missing").unwrap(), None);
    }

    #[test]
    fn invalid_payload_is_not_written() {
        let store = DigestStore::in_memory();
        let err = store.upsert(payload("r-3", "", &[])).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(!err.is_transient());
        assert_eq!(store.find_by_request_id("r-3").unwrap(), None);
    }

    #[test]
    fn list_orders_by_latest_update() {
        let store = DigestStore::in_memory();
        store.upsert(payload("r-a", "a", &[])).unwrap();
        store.upsert(payload("r-b", "b", &[])).unwrap();
        store.upsert(payload("r-a", "a2", &[])).unwrap();

        let requests: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|d| d.request_id)
            .collect();
        assert_eq!(requests, vec!["r-a".to_string(), "r-b".to_string()]);
    }

    #[cfg(feature = "backend-redb")]
    #[test]
    fn redb_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig::redb(dir.path().join("digests.redb").to_string_lossy());
        let stored = {
            let store = DigestStore::from_config(&config).unwrap();
            store.upsert(payload("r-9", "kept", &["x"])).unwrap()
        };
        let store = DigestStore::from_config(&config).unwrap();
        assert_eq!(store.find_by_request_id("r-9").unwrap(), Some(stored));
    }
}
