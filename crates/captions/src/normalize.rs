use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::NormalizeConfig;
use crate::error::CaptionError;
use crate::markup::{decode_entities, strip_markup};
use crate::transcript::Transcript;
use crate::whitespace::collapse_whitespace;

/// `HH:MM:SS.mmm --> HH:MM:SS.mmm`, hours optional, `,` accepted as the
/// millisecond separator so SRT timings match too. Matched anywhere in the
/// line, which also covers trailing cue settings like `align:start position:0%`.
static TIMING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\d{2,}:)?\d{2}:\d{2}[.,]\d{3}\s+-->\s+(?:\d{2,}:)?\d{2}:\d{2}[.,]\d{3}",
    )
    .expect("timing pattern is valid")
});

const FORMAT_IDENTIFIER: &str = "WEBVTT";
const BYTE_ORDER_MARK: char = '\u{feff}';
const METADATA_KEYWORDS: [&str; 3] = ["NOTE", "STYLE", "REGION"];

/// Counters collected during one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub lines: usize,
    pub timing_lines: usize,
    pub cue_indices: usize,
    pub metadata_lines: usize,
    pub text_lines: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SkippingMetadataBlock,
}

/// Normalizes a raw caption document with the default configuration.
///
/// ```rust
/// use captions::normalize_captions;
///
/// let raw = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.500\n<v Ann>Hello &amp; welcome</v>\n";
/// let transcript = normalize_captions(raw).unwrap();
/// assert_eq!(transcript.as_str(), "Hello & welcome");
/// ```
pub fn normalize_captions(raw: &str) -> Result<Transcript, CaptionError> {
    normalize_captions_with(raw, &NormalizeConfig::default()).map(|(transcript, _)| transcript)
}

/// Normalizes a raw caption document and reports what was discarded.
///
/// Single pass over lines with two states. In `Normal`, blank lines, the
/// leading `WEBVTT` line, timing lines and all-digit cue indices are dropped
/// and everything else is cleaned and appended. A `NOTE`/`STYLE`/`REGION`
/// line (and the header block following `WEBVTT`) switches to
/// `SkippingMetadataBlock` until the next blank line or timing line.
pub fn normalize_captions_with(
    raw: &str,
    cfg: &NormalizeConfig,
) -> Result<(Transcript, NormalizeStats), CaptionError> {
    let mut stats = NormalizeStats::default();
    let mut state = State::Normal;
    let mut seen_content = false;
    let mut prose = String::with_capacity(raw.len());
    let raw = raw.strip_prefix(BYTE_ORDER_MARK).unwrap_or(raw);

    for raw_line in raw.lines() {
        stats.lines += 1;
        let line = raw_line.trim();

        if state == State::SkippingMetadataBlock {
            if line.is_empty() {
                state = State::Normal;
            } else if TIMING_PATTERN.is_match(line) {
                // A cue may follow a header without the separating blank line.
                stats.timing_lines += 1;
                state = State::Normal;
            } else {
                stats.metadata_lines += 1;
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        let leading = !seen_content;
        seen_content = true;

        if leading && is_format_identifier(line) {
            stats.metadata_lines += 1;
            state = State::SkippingMetadataBlock;
            continue;
        }
        if starts_metadata_block(line) {
            stats.metadata_lines += 1;
            state = State::SkippingMetadataBlock;
            continue;
        }
        if TIMING_PATTERN.is_match(line) {
            stats.timing_lines += 1;
            continue;
        }
        if line.bytes().all(|b| b.is_ascii_digit()) {
            stats.cue_indices += 1;
            continue;
        }

        let stripped = if cfg.strip_markup {
            strip_markup(line)
        } else {
            Cow::Borrowed(line)
        };
        let decoded = if cfg.decode_entities {
            decode_entities(&stripped)
        } else {
            Cow::Borrowed(&*stripped)
        };

        stats.text_lines += 1;
        prose.push_str(&decoded);
        prose.push(' ');
    }

    let text = collapse_whitespace(&prose);
    debug!(
        lines = stats.lines,
        timing_lines = stats.timing_lines,
        cue_indices = stats.cue_indices,
        metadata_lines = stats.metadata_lines,
        text_lines = stats.text_lines,
        transcript_len = text.len(),
        "captions_normalized"
    );

    if text.is_empty() {
        return Err(CaptionError::EmptyTranscript);
    }
    Ok((Transcript::new(text), stats))
}

fn is_format_identifier(line: &str) -> bool {
    match line.get(..FORMAT_IDENTIFIER.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(FORMAT_IDENTIFIER) => {
            let rest = &line[FORMAT_IDENTIFIER.len()..];
            rest.is_empty() || rest.starts_with(char::is_whitespace)
        }
        _ => false,
    }
}

fn starts_metadata_block(line: &str) -> bool {
    METADATA_KEYWORDS.iter().any(|keyword| {
        line.strip_prefix(keyword)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}
