//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; they go nowhere until a recorder
//! is installed (the server installs a Prometheus one).

use std::time::Duration;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};

pub const TRANSCRIPTS_PUBLISHED: &str = "vdigest_transcripts_published_total";
pub const DIGESTS_COMPLETED: &str = "vdigest_digests_completed_total";
pub const DIGESTS_STORED: &str = "vdigest_digests_stored_total";
pub const STAGE_FAILURES: &str = "vdigest_stage_failures_total";
pub const STAGE_DURATION: &str = "vdigest_stage_duration_seconds";

/// Pipeline stage, used as the `stage` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Digest,
    Store,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Digest => "digest",
            Stage::Store => "store",
        }
    }
}

/// Registers descriptions for every pipeline metric.
pub fn describe_metrics() {
    describe_counter!(
        TRANSCRIPTS_PUBLISHED,
        "Normalized transcripts published for digesting"
    );
    describe_counter!(DIGESTS_COMPLETED, "Digests produced and published");
    describe_counter!(DIGESTS_STORED, "Digest upserts into the result store");
    describe_counter!(STAGE_FAILURES, "Failed stage attempts by stage");
    describe_histogram!(STAGE_DURATION, Unit::Seconds, "Stage latency by stage");
}

pub(crate) fn record_success(stage: Stage, elapsed: Duration) {
    let name = match stage {
        Stage::Ingest => TRANSCRIPTS_PUBLISHED,
        Stage::Digest => DIGESTS_COMPLETED,
        Stage::Store => DIGESTS_STORED,
    };
    counter!(name).increment(1);
    histogram!(STAGE_DURATION, "stage" => stage.as_str()).record(elapsed.as_secs_f64());
}

pub(crate) fn record_failure(stage: Stage, transient: bool) {
    let kind = if transient { "transient" } else { "permanent" };
    counter!(STAGE_FAILURES, "stage" => stage.as_str(), "kind" => kind).increment(1);
}
