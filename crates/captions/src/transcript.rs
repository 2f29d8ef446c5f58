use std::fmt;

use serde::Serialize;

/// Clean transcript prose produced by caption normalization.
///
/// Only the normalizer constructs a `Transcript`, so holders can rely on it
/// being non-empty, trimmed, whitespace-collapsed and free of timing lines,
/// cue indices and markup tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Transcript(String);

impl Transcript {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in Unicode scalar values, the unit window budgets are expressed in.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Transcript {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Transcript> for String {
    fn from(value: Transcript) -> Self {
        value.0
    }
}
