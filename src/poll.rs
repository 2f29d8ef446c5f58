//! Client-side polling for a finished digest.
//!
//! Failures never surface to a client directly: a request that dies in the
//! pipeline just never shows up in the store, and polling gives up.

use std::time::Duration;

use async_trait::async_trait;
use store::{DigestStore, StoredDigest};
use tracing::{debug, info, warn};

use crate::coordinator::Pipeline;
use crate::PipelineError;

/// Polling schedule: first lookup after `initial_delay`, then one every
/// `interval`, `max_attempts` lookups in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Found(StoredDigest),
    GaveUp { attempts: u32 },
}

/// Where a poller looks for results.
#[async_trait]
pub trait DigestLookup: Send + Sync {
    async fn lookup(&self, request_id: &str) -> Result<Option<StoredDigest>, PipelineError>;
}

#[async_trait]
impl DigestLookup for DigestStore {
    async fn lookup(&self, request_id: &str) -> Result<Option<StoredDigest>, PipelineError> {
        Ok(self.find_by_request_id(request_id)?)
    }
}

#[async_trait]
impl DigestLookup for Pipeline {
    async fn lookup(&self, request_id: &str) -> Result<Option<StoredDigest>, PipelineError> {
        self.store().lookup(request_id).await
    }
}

/// Polls `lookup` for `request_id` on the `config` schedule.
///
/// A failed lookup counts as an attempt and polling carries on.
pub async fn poll_for_digest<L>(lookup: &L, request_id: &str, config: &PollConfig) -> PollOutcome
where
    L: DigestLookup + ?Sized,
{
    tokio::time::sleep(config.initial_delay).await;
    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(config.interval).await;
        }
        match lookup.lookup(request_id).await {
            Ok(Some(digest)) => {
                info!(request_id, attempt, "digest_found");
                return PollOutcome::Found(digest);
            }
            Ok(None) => debug!(request_id, attempt, "digest_not_ready"),
            Err(err) => warn!(request_id, attempt, error = %err, "digest_lookup_failed"),
        }
    }
    warn!(request_id, attempts = config.max_attempts, "digest_poll_gave_up");
    PollOutcome::GaveUp {
        attempts: config.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use store::{DigestPayload, StoreError};
    use tokio::time::Instant;

    /// Appears after `ready_after` lookups; fails every lookup listed in `fail_on`.
    struct Countdown {
        store: DigestStore,
        ready_after: u32,
        fail_on: Vec<u32>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl DigestLookup for Countdown {
        async fn lookup(&self, request_id: &str) -> Result<Option<StoredDigest>, PipelineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&call) {
                return Err(StoreError::Backend("unavailable".into()).into());
            }
            if call < self.ready_after {
                return Ok(None);
            }
            self.store.lookup(request_id).await
        }
    }

    fn stored_store() -> DigestStore {
        let store = DigestStore::in_memory();
        store
            .upsert(DigestPayload {
                request_id: "r-1".into(),
                source_url: "u".into(),
                summary: "done".into(),
                tags: vec![],
                sentiment: None,
            })
            .unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn follows_the_schedule() {
        let lookup = Countdown {
            store: stored_store(),
            ready_after: 3,
            fail_on: vec![2],
            calls: AtomicU32::new(0),
        };
        let started = Instant::now();

        let outcome = poll_for_digest(&lookup, "r-1", &PollConfig::default()).await;

        assert!(matches!(outcome, PollOutcome::Found(ref d) if d.summary == "done"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 3);
        // 10s initial delay plus two 5s intervals.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20));
        assert!(elapsed < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let store = DigestStore::in_memory();
        let config = PollConfig {
            max_attempts: 4,
            ..PollConfig::default()
        };

        let outcome = poll_for_digest(&store, "never", &config).await;
        assert_eq!(outcome, PollOutcome::GaveUp { attempts: 4 });
    }

    #[tokio::test]
    async fn found_on_first_attempt_without_delay() {
        let config = PollConfig {
            initial_delay: Duration::ZERO,
            interval: Duration::ZERO,
            max_attempts: 1,
        };
        let outcome = poll_for_digest(&stored_store(), "r-1", &config).await;
        assert!(matches!(outcome, PollOutcome::Found(_)));
    }
}
