//! Configuration for caption normalization.
//!
//! The defaults reproduce the behavior every downstream stage expects: markup
//! is stripped and the fixed entity table is decoded. The toggles exist for
//! callers that feed already-clean text through the same state machine.
//!
//! ```rust
//! use captions::NormalizeConfig;
//!
//! let cfg = NormalizeConfig::default();
//! assert!(cfg.strip_markup);
//! assert!(cfg.decode_entities);
//! ```

use serde::{Deserialize, Serialize};

/// Configuration for [`normalize_captions_with`](crate::normalize_captions_with).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Remove inline `<...>` markup (voice spans, styling, inline timestamps).
    pub strip_markup: bool,
    /// Decode `&amp; &lt; &gt; &quot; &apos; &#39; &nbsp;`. Other entities
    /// are left verbatim.
    pub decode_entities: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            strip_markup: true,
            decode_entities: true,
        }
    }
}
