//! Caption normalization layer.
//!
//! Turns a raw WebVTT (or SRT-shaped) caption document into one line of clean
//! prose. Everything downstream (windowing, summarization, storage) works on
//! the [`Transcript`] this crate produces.
//!
//! ## What we drop
//!
//! - The `WEBVTT` format identifier and the header block that follows it
//! - `NOTE`, `STYLE` and `REGION` blocks, up to the next blank or timing line
//! - Cue timing lines (`00:00:01.000 --> 00:00:04.000 align:start ...`)
//! - Numeric cue indices
//! - Inline `<...>` markup, including inline word timestamps
//!
//! ## What we keep
//!
//! Caption text, in document order, with a fixed set of HTML entities decoded
//! and all whitespace collapsed to single spaces. No deduplication of rolling
//! auto-captions happens here.
//!
//! ## Pure function guarantee
//!
//! No I/O and no clock. Same input and config give the same transcript.
//! A document with no text left afterwards is an error
//! ([`CaptionError::EmptyTranscript`]), never an empty transcript.

mod config;
mod error;
mod markup;
mod normalize;
mod transcript;
mod whitespace;

pub use crate::config::NormalizeConfig;
pub use crate::error::CaptionError;
pub use crate::normalize::{normalize_captions, normalize_captions_with, NormalizeStats};
pub use crate::transcript::Transcript;
pub use crate::whitespace::collapse_whitespace;
