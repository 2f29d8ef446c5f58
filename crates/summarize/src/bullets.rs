//! Post-processing of summarizer output: bullet cleanup, tag and sentiment
//! normalization.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on tags attached to a digest.
pub const MAX_TAGS: usize = 10;

const BULLET_MARKERS: [char; 3] = ['-', '*', '•'];

static NUMBERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.)\-\s]+").expect("numbered marker pattern is valid"));

/// Strips one leading bullet marker and a numeric list marker from a line.
///
/// Returns `None` when nothing is left.
///
/// ```rust
/// use summarize::clean_bullet;
///
/// assert_eq!(clean_bullet("  - first point").as_deref(), Some("first point"));
/// assert_eq!(clean_bullet("2) second point").as_deref(), Some("second point"));
/// assert_eq!(clean_bullet("•   "), None);
/// ```
pub fn clean_bullet(line: &str) -> Option<String> {
    let line = line.trim();
    let line = line
        .strip_prefix(BULLET_MARKERS)
        .unwrap_or(line)
        .trim();
    let line = NUMBERED_MARKER.replace(line, "");
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_owned())
}

/// Trims, lowercases and dedupes tags, keeping first occurrences, capped at
/// [`MAX_TAGS`].
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .take(MAX_TAGS)
        .collect()
}

pub fn normalize_sentiment(sentiment: Option<&str>) -> Option<String> {
    sentiment
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_bullet_marker() {
        assert_eq!(clean_bullet("* starred").as_deref(), Some("starred"));
        assert_eq!(clean_bullet("• dotted").as_deref(), Some("dotted"));
        assert_eq!(clean_bullet("-- double").as_deref(), Some("- double"));
    }

    #[test]
    fn strips_numbered_markers() {
        assert_eq!(clean_bullet("1. one").as_deref(), Some("one"));
        assert_eq!(clean_bullet("12- twelve").as_deref(), Some("twelve"));
        assert_eq!(clean_bullet("- 3) three").as_deref(), Some("three"));
    }

    #[test]
    fn drops_blank_bullets() {
        assert_eq!(clean_bullet(""), None);
        assert_eq!(clean_bullet("   "), None);
        assert_eq!(clean_bullet("-"), None);
        assert_eq!(clean_bullet("4."), None);
    }

    #[test]
    fn tags_are_lowercased_and_deduped() {
        let tags = normalize_tags(["Tech", " tech ", "AI", "", "ai"]);
        assert_eq!(tags, vec!["tech", "ai"]);
    }

    #[test]
    fn tags_are_capped() {
        let raw: Vec<String> = (0..25).map(|i| format!("tag{i}")).collect();
        let tags = normalize_tags(&raw);
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags[0], "tag0");
        assert_eq!(tags[9], "tag9");
    }

    #[test]
    fn duplicates_do_not_count_toward_cap() {
        let mut raw = vec!["same"; 20];
        raw.push("other");
        assert_eq!(normalize_tags(raw), vec!["same", "other"]);
    }

    #[test]
    fn sentiment_normalization() {
        assert_eq!(normalize_sentiment(Some(" Positive ")).as_deref(), Some("positive"));
        assert_eq!(normalize_sentiment(Some("  ")), None);
        assert_eq!(normalize_sentiment(None), None);
    }
}
