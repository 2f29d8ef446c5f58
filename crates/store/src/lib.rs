//! Result store for finished digests.
//!
//! [`DigestStore::upsert`] is the only write path. It is idempotent per
//! `request_id`: the record id is derived from the request id, so an event
//! delivered twice overwrites the same record instead of adding a second one.
//!
//! Storage is pluggable through [`StoreBackend`]. [`InMemoryBackend`] is for
//! tests and single-run CLIs; `RedbBackend` (feature `backend-redb`, on by
//! default) is an embedded durable store.
//!
//! ```
//! use store::{DigestPayload, DigestStore};
//!
//! let store = DigestStore::in_memory();
//! let payload = DigestPayload {
//!     request_id: "req-1".into(),
//!     source_url: "https://www.youtube.com/watch?v=abc".into(),
//!     summary: "A short talk about rust.".into(),
//!     tags: vec!["rust".into()],
//!     sentiment: None,
//! };
//! store.upsert(payload.clone()).unwrap();
//! let stored = store.upsert(payload).unwrap();
//! assert_eq!(store.find_by_request_id("req-1").unwrap(), Some(stored));
//! ```

mod backend;
mod error;
mod record;
mod store;

pub use crate::backend::{BackendConfig, InMemoryBackend, StoreBackend};
#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbBackend;
pub use crate::error::StoreError;
pub use crate::record::{digest_id, DigestPayload, StoredDigest};
pub use crate::store::DigestStore;
