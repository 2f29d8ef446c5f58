//! Overlapping window segmentation for long transcripts.
//!
//! Offsets and budgets are counted in Unicode scalar values, so a window never
//! splits a code point. Consecutive windows share exactly `overlap` characters
//! and together cover the whole input.
//!
//! ```rust
//! use summarize::{split_windows, WindowConfig};
//!
//! let cfg = WindowConfig { single_pass_limit: 10, window_size: 6, overlap: 2 };
//! let windows = split_windows("abcdefghijklmn", &cfg);
//! let starts: Vec<usize> = windows.iter().map(|w| w.start).collect();
//! assert_eq!(starts, vec![0, 4, 8]);
//! assert_eq!(windows.last().unwrap().end, 14);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SummarizeError;

/// Budgets for single-pass vs windowed digesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Transcripts up to this many characters are digested in one call.
    pub single_pass_limit: usize,
    /// Maximum characters per window.
    pub window_size: usize,
    /// Characters shared by consecutive windows. Must be below `window_size`.
    pub overlap: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            single_pass_limit: 12_000,
            window_size: 5_000,
            overlap: 400,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), SummarizeError> {
        if self.window_size == 0 {
            return Err(SummarizeError::InvalidConfig(
                "window_size must be >= 1".into(),
            ));
        }
        if self.overlap >= self.window_size {
            return Err(SummarizeError::InvalidConfig(format!(
                "overlap ({}) must be smaller than window_size ({})",
                self.overlap, self.window_size
            )));
        }
        Ok(())
    }

    /// Characters between the starts of two consecutive windows.
    pub fn stride(&self) -> usize {
        self.window_size - self.overlap
    }
}

/// One contiguous slice of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Zero-based position in window order.
    pub index: usize,
    /// Character offset of the first character (inclusive).
    pub start: usize,
    /// Character offset one past the last character.
    pub end: usize,
    pub text: String,
}

impl Window {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Splits `text` into overlapping windows.
///
/// Text within `single_pass_limit` comes back as a single window equal to the
/// input. Otherwise slices of `window_size` characters are cut, advancing by
/// `window_size - overlap`, until a slice reaches the end of the text; the
/// final slice may be shorter. `cfg` is expected to be validated.
pub fn split_windows(text: &str, cfg: &WindowConfig) -> Vec<Window> {
    // Byte offset of every char boundary, including the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = boundaries.len() - 1;

    if total <= cfg.single_pass_limit {
        return vec![Window {
            index: 0,
            start: 0,
            end: total,
            text: text.to_owned(),
        }];
    }

    let stride = cfg.stride().max(1);
    let mut windows = Vec::with_capacity(total / stride + 1);
    let mut start = 0;
    loop {
        let end = (start + cfg.window_size).min(total);
        windows.push(Window {
            index: windows.len(),
            start,
            end,
            text: text[boundaries[start]..boundaries[end]].to_owned(),
        });
        if end == total {
            break;
        }
        start = end - cfg.overlap;
    }
    windows
}
