use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AcquisitionError;

/// Identity of one digest request.
///
/// `request_id` is assigned once at ingestion and is the correlation key on
/// every event and store lookup that follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestRequest {
    pub request_id: String,
    pub source_url: String,
    pub requested_at: DateTime<Utc>,
}

impl DigestRequest {
    /// Validates `source_url` and assigns a fresh request id.
    ///
    /// ```rust
    /// use ingest::DigestRequest;
    ///
    /// let req = DigestRequest::new("  https://youtu.be/abc  ").unwrap();
    /// assert_eq!(req.source_url, "https://youtu.be/abc");
    /// assert_eq!(req.request_id.len(), 36);
    /// ```
    pub fn new(source_url: &str) -> Result<Self, AcquisitionError> {
        Ok(Self {
            request_id: new_request_id(),
            source_url: validate_source_url(source_url)?,
            requested_at: Utc::now(),
        })
    }
}

/// Fresh random (UUIDv4) request id in hyphenated form.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trims the URL and rejects blanks and values that would be parsed as a
/// flag by a command-line tool.
pub fn validate_source_url(source_url: &str) -> Result<String, AcquisitionError> {
    let url = source_url.trim();
    if url.is_empty() {
        return Err(AcquisitionError::InvalidSource(
            "source url is blank".into(),
        ));
    }
    if url.starts_with('-') {
        return Err(AcquisitionError::InvalidSource(format!(
            "source url may not start with '-': {url}"
        )));
    }
    if url.chars().any(char::is_control) {
        return Err(AcquisitionError::InvalidSource(
            "source url contains control characters".into(),
        ));
    }
    Ok(url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_v4() {
        let a = DigestRequest::new("https://youtu.be/a").unwrap();
        let b = DigestRequest::new("https://youtu.be/a").unwrap();
        assert_ne!(a.request_id, b.request_id);
        let parsed = Uuid::parse_str(&a.request_id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn blank_and_flag_like_urls_rejected() {
        assert!(matches!(
            validate_source_url("   "),
            Err(AcquisitionError::InvalidSource(_))
        ));
        assert!(matches!(
            validate_source_url("--exec rm"),
            Err(AcquisitionError::InvalidSource(_))
        ));
        assert!(matches!(
            validate_source_url("https://x\n--y"),
            Err(AcquisitionError::InvalidSource(_))
        ));
    }

    #[test]
    fn serializes_camel_case() {
        let req = DigestRequest::new("https://youtu.be/a").unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("requestId").is_some());
        assert_eq!(json["sourceUrl"], "https://youtu.be/a");
    }
}
