use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use store::{DigestStore, StoreError};
use vdigest::IngestionService;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,

    /// Accepts new requests.
    pub ingestion: IngestionService,

    /// Where finished digests are looked up.
    pub store: DigestStore,

    /// Renders `/metrics`; `None` when metrics are disabled.
    pub metrics: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        ingestion: IngestionService,
        store: DigestStore,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            ingestion,
            store,
            metrics,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Runs a store read on the blocking pool, the same way the result
    /// consumer runs its writes.
    pub async fn read_store<T, F>(&self, read: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DigestStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.store.clone();
        let value = tokio::task::spawn_blocking(move || read(&store))
            .await
            .map_err(|err| ServerError::Internal(format!("store task: {err}")))??;
        Ok(value)
    }
}
