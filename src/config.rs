//! YAML configuration for the vdigest pipeline.
//!
//! Every stage is configured from one file. All sections are optional and
//! fall back to production defaults; values are validated on load.
//!
//! `poll` is read by clients waiting on a digest (`vdigest --pipeline` and
//! callers of [`poll_for_digest`](crate::poll_for_digest)), not by the
//! pipeline stages.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "local"
//!
//! ingestion:
//!   source: "yt_dlp"
//!   binary: "yt-dlp"
//!   sub_langs: "en"
//!   acquire_timeout_ms: 120000
//!   workers: 4
//!
//! captions:
//!   strip_markup: true
//!   decode_entities: true
//!
//! windowing:
//!   single_pass_limit: 12000
//!   window_size: 5000
//!   overlap: 400
//!   max_concurrent_windows: 4
//!   call_timeout_ms: 120000
//!
//! summarizer:
//!   provider: "chat"
//!   chat:
//!     base_url: "https://api.openai.com/v1"
//!     model: "gpt-4o-mini"
//!     api_key_env: "OPENAI_API_KEY"
//!
//! bus:
//!   max_deliveries: 5
//!   redelivery_delay_ms: 500
//!   consumers_per_role: 2
//!
//! store:
//!   backend: "redb"
//!   redb_path: "/var/lib/vdigest/digests.redb"
//!
//! poll:
//!   initial_delay_ms: 10000
//!   interval_ms: 5000
//!   max_attempts: 120
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bus::BusConfig;
use captions::NormalizeConfig;
use ingest::YtDlpConfig;
use serde::{Deserialize, Serialize};
use store::BackendConfig;
use summarize::{ChatConfig, OrchestratorConfig, WindowConfig};
use thiserror::Error;

use crate::poll::PollConfig;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level YAML configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VdigestConfig {
    /// Configuration format version
    #[serde(default = "default_config_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingestion: IngestionYamlConfig,

    #[serde(default)]
    pub captions: NormalizeConfig,

    #[serde(default)]
    pub windowing: WindowingYamlConfig,

    #[serde(default)]
    pub summarizer: SummarizerYamlConfig,

    #[serde(default)]
    pub bus: BusYamlConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub poll: PollYamlConfig,
}

impl VdigestConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: VdigestConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.ingestion.validate()?;
        self.windowing.validate()?;
        self.summarizer.validate()?;
        self.bus.validate()?;
        self.store.validate()?;
        self.poll.validate()?;
        Ok(())
    }
}

impl Default for VdigestConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            name: None,
            ingestion: IngestionYamlConfig::default(),
            captions: NormalizeConfig::default(),
            windowing: WindowingYamlConfig::default(),
            summarizer: SummarizerYamlConfig::default(),
            bus: BusYamlConfig::default(),
            store: StoreYamlConfig::default(),
            poll: PollYamlConfig::default(),
        }
    }
}

/// Caption acquisition and the ingestion worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionYamlConfig {
    /// `yt_dlp` or `file`.
    #[serde(default = "default_source")]
    pub source: String,

    /// Base directory for relative paths when `source` is `file`.
    #[serde(default)]
    pub file_root: Option<String>,

    #[serde(default = "default_binary")]
    pub binary: String,

    #[serde(default)]
    pub binary_args: Vec<String>,

    #[serde(default = "default_sub_langs")]
    pub sub_langs: String,

    #[serde(default = "default_sub_format")]
    pub sub_format: String,

    #[serde(default)]
    pub extra_args: Vec<String>,

    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Worker pool size. Defaults to the available parallelism, at least 2.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl IngestionYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_sources = ["yt_dlp", "file"];
        if !valid_sources.contains(&self.source.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "ingestion.source must be one of: {valid_sources:?}"
            )));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "ingestion.acquire_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(ConfigLoadError::Validation(
                "ingestion.workers must be >= 1".to_string(),
            ));
        }
        self.to_ytdlp_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn to_ytdlp_config(&self) -> YtDlpConfig {
        YtDlpConfig {
            binary: PathBuf::from(&self.binary),
            binary_args: self.binary_args.clone(),
            sub_langs: self.sub_langs.clone(),
            sub_format: self.sub_format.clone(),
            extra_args: self.extra_args.clone(),
            timeout: self.acquire_timeout(),
        }
    }
}

impl Default for IngestionYamlConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            file_root: None,
            binary: default_binary(),
            binary_args: Vec::new(),
            sub_langs: default_sub_langs(),
            sub_format: default_sub_format(),
            extra_args: Vec::new(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            workers: None,
        }
    }
}

/// Windowing and orchestration budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowingYamlConfig {
    #[serde(default = "default_single_pass_limit")]
    pub single_pass_limit: usize,

    #[serde(default = "default_window_size")]
    pub window_size: usize,

    #[serde(default = "default_overlap")]
    pub overlap: usize,

    #[serde(default = "default_max_concurrent_windows")]
    pub max_concurrent_windows: usize,

    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl WindowingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_orchestrator_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("windowing: {e}")))
    }

    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            window: WindowConfig {
                single_pass_limit: self.single_pass_limit,
                window_size: self.window_size,
                overlap: self.overlap,
            },
            max_concurrent_windows: self.max_concurrent_windows,
            call_timeout: Duration::from_millis(self.call_timeout_ms),
        }
    }
}

impl Default for WindowingYamlConfig {
    fn default() -> Self {
        Self {
            single_pass_limit: default_single_pass_limit(),
            window_size: default_window_size(),
            overlap: default_overlap(),
            max_concurrent_windows: default_max_concurrent_windows(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

/// Which summarizer backs the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerYamlConfig {
    /// `chat` (OpenAI-compatible HTTP API) or `stub` (offline, deterministic).
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl SummarizerYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_providers = ["chat", "stub"];
        if !valid_providers.contains(&self.provider.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "summarizer.provider must be one of: {valid_providers:?}"
            )));
        }
        if self.provider == "chat" {
            if self.chat.base_url.trim().is_empty() {
                return Err(ConfigLoadError::MissingField(
                    "summarizer.chat.base_url".to_string(),
                ));
            }
            if self.chat.model.trim().is_empty() {
                return Err(ConfigLoadError::MissingField(
                    "summarizer.chat.model".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SummarizerYamlConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            chat: ChatConfig::default(),
        }
    }
}

/// Redelivery policy and consumer fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusYamlConfig {
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,

    #[serde(default = "default_redelivery_delay_ms")]
    pub redelivery_delay_ms: u64,

    /// Consumer loops started per pipeline role.
    #[serde(default = "default_consumers_per_role")]
    pub consumers_per_role: usize,
}

impl BusYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.max_deliveries == 0 {
            return Err(ConfigLoadError::Validation(
                "bus.max_deliveries must be >= 1".to_string(),
            ));
        }
        if self.consumers_per_role == 0 {
            return Err(ConfigLoadError::Validation(
                "bus.consumers_per_role must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_bus_config(&self) -> BusConfig {
        BusConfig {
            max_deliveries: self.max_deliveries,
            redelivery_delay: Duration::from_millis(self.redelivery_delay_ms),
        }
    }
}

impl Default for BusYamlConfig {
    fn default() -> Self {
        Self {
            max_deliveries: default_max_deliveries(),
            redelivery_delay_ms: default_redelivery_delay_ms(),
            consumers_per_role: default_consumers_per_role(),
        }
    }
}

/// Result store backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub redb_path: Option<String>,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["in_memory", "redb"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.backend must be one of: {valid_backends:?}"
            )));
        }
        if self.backend == "redb" && self.redb_path.is_none() {
            return Err(ConfigLoadError::MissingField("store.redb_path".to_string()));
        }
        Ok(())
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        match (self.backend.as_str(), &self.redb_path) {
            ("redb", Some(path)) => BackendConfig::redb(path.clone()),
            _ => BackendConfig::in_memory(),
        }
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redb_path: None,
        }
    }
}

/// Client-side polling schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollYamlConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl PollYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.max_attempts == 0 {
            return Err(ConfigLoadError::Validation(
                "poll.max_attempts must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

impl Default for PollYamlConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_config_version() -> String {
    "1.0".to_string()
}
fn default_source() -> String {
    "yt_dlp".to_string()
}
fn default_binary() -> String {
    "yt-dlp".to_string()
}
fn default_sub_langs() -> String {
    "en".to_string()
}
fn default_sub_format() -> String {
    "vtt/best".to_string()
}
fn default_acquire_timeout_ms() -> u64 {
    120_000
}
fn default_single_pass_limit() -> usize {
    12_000
}
fn default_window_size() -> usize {
    5_000
}
fn default_overlap() -> usize {
    400
}
fn default_max_concurrent_windows() -> usize {
    4
}
fn default_call_timeout_ms() -> u64 {
    120_000
}
fn default_provider() -> String {
    "chat".to_string()
}
fn default_max_deliveries() -> u32 {
    5
}
fn default_redelivery_delay_ms() -> u64 {
    500
}
fn default_consumers_per_role() -> usize {
    1
}
fn default_backend() -> String {
    "in_memory".to_string()
}
fn default_initial_delay_ms() -> u64 {
    10_000
}
fn default_interval_ms() -> u64 {
    5_000
}
fn default_max_attempts() -> u32 {
    120
}
