use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::AcquisitionError;
use crate::source::CaptionSource;

/// Reads caption documents from the local filesystem.
///
/// The source URL is a path, optionally prefixed with `file://`. With a
/// `root` set, only relative paths that stay below it are accepted.
#[derive(Debug, Clone, Default)]
pub struct FileCaptionSource {
    root: Option<PathBuf>,
}

impl FileCaptionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, source_url: &str) -> Result<PathBuf, AcquisitionError> {
        let raw = source_url.strip_prefix("file://").unwrap_or(source_url);
        let path = Path::new(raw);
        let Some(root) = &self.root else {
            return Ok(path.to_path_buf());
        };
        let contained = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(AcquisitionError::InvalidSource(format!(
                "path escapes caption root: {raw}"
            )));
        }
        Ok(root.join(path))
    }
}

#[async_trait]
impl CaptionSource for FileCaptionSource {
    async fn acquire(&self, source_url: &str) -> Result<String, AcquisitionError> {
        let path = self.resolve(source_url)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AcquisitionError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), bytes = bytes.len(), "captions_read");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("talk.vtt"), "WEBVTT\n\nhi").unwrap();

        let source = FileCaptionSource::with_root(dir.path());
        assert_eq!(source.acquire("talk.vtt").await.unwrap(), "WEBVTT\n\nhi");
        assert_eq!(source.acquire("file://talk.vtt").await.unwrap(), "WEBVTT\n\nhi");
    }

    #[tokio::test]
    async fn absolute_paths_without_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abs.vtt");
        std::fs::write(&path, "WEBVTT").unwrap();

        let source = FileCaptionSource::new();
        let url = format!("file://{}", path.display());
        assert_eq!(source.acquire(&url).await.unwrap(), "WEBVTT");
    }

    #[tokio::test]
    async fn absolute_paths_rejected_under_root() {
        let outside = tempfile::tempdir().unwrap();
        let path = outside.path().join("secret.vtt");
        std::fs::write(&path, "WEBVTT\n\nsecret").unwrap();
        let root = tempfile::tempdir().unwrap();

        let source = FileCaptionSource::with_root(root.path());
        for url in [path.display().to_string(), format!("file://{}", path.display())] {
            let err = source.acquire(&url).await.unwrap_err();
            assert!(matches!(err, AcquisitionError::InvalidSource(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn parent_components_rejected_under_root() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.vtt"), "WEBVTT\n\nsecret").unwrap();
        let root = outside.path().join("captions");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("talk.vtt"), "WEBVTT").unwrap();

        let source = FileCaptionSource::with_root(&root);
        for url in ["../secret.vtt", "sub/../../secret.vtt", "../../../../etc/hostname"] {
            let err = source.acquire(url).await.unwrap_err();
            assert!(matches!(err, AcquisitionError::InvalidSource(_)), "{url}");
        }
        assert_eq!(source.acquire("./talk.vtt").await.unwrap(), "WEBVTT");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let source = FileCaptionSource::new();
        let err = source.acquire("/definitely/missing.vtt").await.unwrap_err();
        assert!(matches!(err, AcquisitionError::NotFound(_)));
    }
}
