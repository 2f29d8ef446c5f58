//! Error types produced by the ingest crate.
//!
//! Every failure to turn a source URL into raw caption text is an
//! [`AcquisitionError`]. Errors are cloneable and comparable so they can be
//! logged, counted and asserted on without losing detail.
//!
//! | Error | Meaning |
//! |-------|---------|
//! | [`InvalidSource`](AcquisitionError::InvalidSource) | URL blank or shaped like a command-line flag |
//! | [`NotFound`](AcquisitionError::NotFound) | Source exists but has no caption track |
//! | [`ToolFailed`](AcquisitionError::ToolFailed) | Download tool exited non-zero |
//! | [`Timeout`](AcquisitionError::Timeout) | Acquisition exceeded its budget |
//! | [`Io`](AcquisitionError::Io) | Spawning, temp dir or file access failed |

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error("no captions found for {0}")]
    NotFound(String),
    /// `status` is `None` when the tool was killed by a signal.
    #[error("caption tool exited with status {status:?}: {stderr}")]
    ToolFailed { status: Option<i32>, stderr: String },
    #[error("caption acquisition timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(String),
}

impl AcquisitionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Io(_) | Self::ToolFailed { .. })
    }
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
