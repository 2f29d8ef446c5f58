//! Configuration for caption acquisition.
//!
//! ```rust
//! use ingest::YtDlpConfig;
//!
//! let config = YtDlpConfig::default();
//! config.validate().expect("defaults are valid");
//! assert_eq!(config.sub_langs, "en");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised when validating [`YtDlpConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid ingest config: {0}")]
    Invalid(String),
}

/// How [`YtDlpCaptionSource`](crate::YtDlpCaptionSource) invokes the
/// download tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtDlpConfig {
    /// Program to run, `yt-dlp` on `PATH` by default.
    pub binary: PathBuf,
    /// Arguments placed before the generated ones, e.g. `["-m", "yt_dlp"]`
    /// when `binary` is a Python interpreter.
    pub binary_args: Vec<String>,
    /// Value of `--sub-langs`.
    pub sub_langs: String,
    /// Value of `--sub-format`.
    pub sub_format: String,
    /// Extra flags appended after the generated ones and before the URL.
    pub extra_args: Vec<String>,
    /// Budget for the whole subprocess run.
    pub timeout: Duration,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            binary_args: Vec::new(),
            sub_langs: "en".into(),
            sub_format: "vtt/best".into(),
            extra_args: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl YtDlpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.binary.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("binary must not be empty".into()));
        }
        if self.sub_langs.trim().is_empty() {
            return Err(ConfigError::Invalid("sub_langs must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be positive".into()));
        }
        Ok(())
    }

    /// Arguments passed to the tool for `url`, in order.
    pub(crate) fn command_args(&self, url: &str) -> Vec<String> {
        let mut args = self.binary_args.clone();
        args.extend(
            [
                "--skip-download",
                "--write-auto-subs",
                "--write-subs",
                "--sub-langs",
                self.sub_langs.as_str(),
                "--sub-format",
                self.sub_format.as_str(),
                "-o",
                "%(id)s.%(ext)s",
            ]
            .map(str::to_owned),
        );
        args.extend(self.extra_args.iter().cloned());
        args.push("--".into());
        args.push(url.to_owned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_shape() {
        let cfg = YtDlpConfig {
            extra_args: vec!["--no-playlist".into()],
            ..Default::default()
        };
        let args = cfg.command_args("https://youtu.be/abc");
        assert_eq!(
            args,
            vec![
                "--skip-download",
                "--write-auto-subs",
                "--write-subs",
                "--sub-langs",
                "en",
                "--sub-format",
                "vtt/best",
                "-o",
                "%(id)s.%(ext)s",
                "--no-playlist",
                "--",
                "https://youtu.be/abc",
            ]
        );
    }

    #[test]
    fn binary_args_come_first() {
        let cfg = YtDlpConfig {
            binary: PathBuf::from("python3"),
            binary_args: vec!["-m".into(), "yt_dlp".into()],
            ..Default::default()
        };
        let args = cfg.command_args("u");
        assert_eq!(&args[..3], &["-m", "yt_dlp", "--skip-download"]);
    }

    #[test]
    fn validation() {
        assert!(YtDlpConfig::default().validate().is_ok());
        let cfg = YtDlpConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = YtDlpConfig {
            sub_langs: " ".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
