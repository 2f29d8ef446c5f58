//! Digest ingest layer.
//!
//! This is where a digest request enters the pipeline: a source URL gets a
//! request identity, and the caption document behind the URL is fetched.
//!
//! ## What we do here
//!
//! - **Assign identity** - [`DigestRequest::new`] validates the URL and
//!   assigns a random UUIDv4 `request_id` that correlates everything
//!   downstream.
//! - **Acquire captions** - [`CaptionSource`] abstracts where captions come
//!   from. [`YtDlpCaptionSource`] shells out to `yt-dlp` with downloads
//!   disabled and subtitles on, under a timeout, in a scratch directory that
//!   is always removed. [`FileCaptionSource`] reads local `.vtt` files.
//! - **Log everything** - structured `tracing` events for each acquisition.
//!
//! Normalizing the captions is not done here; see the `captions` crate.
//!
//! ## Example
//!
//! ```no_run
//! use ingest::{CaptionSource, DigestRequest, YtDlpCaptionSource};
//!
//! # async fn run() -> Result<(), ingest::AcquisitionError> {
//! let request = DigestRequest::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ")?;
//! let raw = YtDlpCaptionSource::default().acquire(&request.source_url).await?;
//! println!("{} bytes of captions for {}", raw.len(), request.request_id);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod file;
mod request;
mod source;
mod ytdlp;

pub use crate::config::{ConfigError, YtDlpConfig};
pub use crate::error::AcquisitionError;
pub use crate::file::FileCaptionSource;
pub use crate::request::{new_request_id, validate_source_url, DigestRequest};
pub use crate::source::CaptionSource;
pub use crate::ytdlp::YtDlpCaptionSource;
