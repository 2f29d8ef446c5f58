use async_trait::async_trait;

use crate::error::AcquisitionError;

/// Produces the raw caption document for a source URL.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn acquire(&self, source_url: &str) -> Result<String, AcquisitionError>;

    /// Label used in logs.
    fn name(&self) -> &str {
        "caption_source"
    }
}
