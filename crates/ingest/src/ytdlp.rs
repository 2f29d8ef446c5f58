//! Caption download through the `yt-dlp` command-line tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::YtDlpConfig;
use crate::error::AcquisitionError;
use crate::source::CaptionSource;

/// Runs `yt-dlp` in a scratch directory with downloads disabled and
/// subtitles (manual and automatic) enabled, then reads back the largest
/// `.vtt` file it wrote. The scratch directory is removed afterwards.
#[derive(Debug, Clone, Default)]
pub struct YtDlpCaptionSource {
    config: YtDlpConfig,
}

impl YtDlpCaptionSource {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &YtDlpConfig {
        &self.config
    }

    async fn run_tool(&self, url: &str, workdir: &Path) -> Result<(), AcquisitionError> {
        let args = self.config.command_args(url);
        let mut command = Command::new(&self.config.binary);
        command
            .args(&args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| AcquisitionError::Timeout(self.config.timeout))?
            .map_err(|e| {
                AcquisitionError::Io(format!(
                    "failed to run {}: {e}",
                    self.config.binary.display()
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            debug!(tool = %self.config.binary.display(), "{line}");
        }

        if !output.status.success() {
            return Err(AcquisitionError::ToolFailed {
                status: output.status.code(),
                stderr: tail(&stderr, 20),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    async fn acquire(&self, source_url: &str) -> Result<String, AcquisitionError> {
        let started = Instant::now();
        let workdir = tempfile::Builder::new()
            .prefix("vdigest-captions-")
            .tempdir()?;

        let result = async {
            self.run_tool(source_url, workdir.path()).await?;
            let path = largest_vtt(workdir.path())
                .await?
                .ok_or_else(|| AcquisitionError::NotFound(source_url.to_owned()))?;
            let bytes = tokio::fs::read(&path).await?;
            Ok::<_, AcquisitionError>((path, String::from_utf8_lossy(&bytes).into_owned()))
        }
        .await;

        let scratch = workdir.path().to_path_buf();
        if let Err(e) = workdir.close() {
            warn!(path = %scratch.display(), error = %e, "failed to clean up temp dir");
        }

        let (path, captions) = result?;
        info!(
            source_url,
            file = %path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            bytes = captions.len(),
            elapsed_micros = started.elapsed().as_micros() as u64,
            "captions_acquired"
        );
        Ok(captions)
    }

    fn name(&self) -> &str {
        "yt-dlp"
    }
}

/// Largest `.vtt` file directly inside `dir`, if any.
pub(crate) async fn largest_vtt(dir: &Path) -> Result<Option<PathBuf>, AcquisitionError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut best: Option<(u64, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_vtt = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("vtt"));
        if !is_vtt {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let len = metadata.len();
        if best.as_ref().is_none_or(|(best_len, _)| len > *best_len) {
            best = Some((len, path));
        }
    }
    Ok(best.map(|(_, path)| path))
}

fn tail(text: &str, lines: usize) -> String {
    let collected: Vec<&str> = text.lines().collect();
    collected[collected.len().saturating_sub(lines)..]
        .join("\n")
        .trim()
        .to_owned()
}
