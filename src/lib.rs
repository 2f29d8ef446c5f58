//! vdigest: turn a video URL into a stored digest.
//!
//! This crate stitches the workspace crates into one pipeline:
//!
//! 1. [`IngestionService`] assigns a request id, acquires captions on a
//!    bounded [`WorkerPool`], normalizes them and publishes
//!    [`TranscriptReady`](bus::TranscriptReady).
//! 2. [`DigestProcessor`] consumes transcripts, runs the
//!    [`DigestOrchestrator`](summarize::DigestOrchestrator) and publishes
//!    [`DigestCompleted`](bus::DigestCompleted).
//! 3. [`ResultConsumer`] upserts completed digests into the
//!    [`DigestStore`](store::DigestStore).
//!
//! Stages only talk through the event bus, which delivers at least once;
//! every consumer is idempotent per `request_id`. A request that fails
//! anywhere simply never reaches the store, and clients find out by
//! [`poll_for_digest`] giving up.
//!
//! [`Pipeline::start`] wires all three roles from a [`VdigestConfig`].

pub use bus;
pub use captions;
pub use ingest;
pub use store;
pub use summarize;

use bus::BusError;
use captions::CaptionError;
use ingest::AcquisitionError;
use store::StoreError;
use summarize::SummarizeError;
use thiserror::Error;

pub mod config;
pub mod coordinator;
pub mod poll;
pub mod pool;
pub mod telemetry;

pub use crate::config::{ConfigLoadError, VdigestConfig};
pub use crate::coordinator::{
    AI_PROCESSOR_GROUP, Collaborators, DigestProcessor, IngestionService, Pipeline,
    RESULT_SERVICE_GROUP, ResultConsumer,
};
pub use crate::poll::{DigestLookup, PollConfig, PollOutcome, poll_for_digest};
pub use crate::pool::{WorkerPool, default_pool_size};

/// Errors that can occur while moving a request through the pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("caption acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("caption normalization failed: {0}")]
    Captions(#[from] CaptionError),
    #[error("digest failed: {0}")]
    Summarize(#[from] SummarizeError),
    #[error("event bus failure: {0}")]
    Bus(#[from] BusError),
    #[error("result store failure: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Whether retrying the same input may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Acquisition(err) => err.is_transient(),
            PipelineError::Captions(_) => false,
            PipelineError::Summarize(err) => err.is_transient(),
            PipelineError::Bus(err) => err.is_transient(),
            PipelineError::Store(err) => err.is_transient(),
        }
    }
}
