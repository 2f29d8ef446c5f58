//! Whitespace normalization utilities.
//!
//! [`collapse_whitespace`] is the final step of caption normalization and is
//! also reused by the digest orchestrator before it measures a transcript
//! against the single-pass budget. Applying it twice is a no-op.
//!
//! # Examples
//!
//! ```rust
//! use captions::collapse_whitespace;
//!
//! let normalized = collapse_whitespace("  hello \n\n  world\t ");
//! assert_eq!(normalized, "hello world");
//! ```

/// Collapses runs of Unicode whitespace into single ASCII spaces and trims
/// both edges.
///
/// Returns an empty string for empty or whitespace-only input. Non-breaking
/// spaces (U+00A0) count as whitespace, which matters because `&nbsp;` is
/// decoded into one before this runs.
///
/// ```rust
/// use captions::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("a\u{00A0}\u{00A0}b"), "a b");
/// assert_eq!(collapse_whitespace("   "), "");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}
