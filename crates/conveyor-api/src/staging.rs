//! Local staging area for admitted uploads.
//!
//! Uploaded bytes are written here before the transfer worker mirrors them
//! to the object store. Files are named by their generated storage name
//! (`{uuid}.{ext}`), so rewriting the same name is an idempotent overwrite.
//! Staged files are removed after a successful transfer; files whose
//! transfers exhaust their retries stay on disk for inspection.

use std::path::{Path, PathBuf};

use conveyor_core::AppError;

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Open a staging area, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Write staged bytes under `storage_filename`, returning the full path.
    pub async fn write(&self, storage_filename: &str, data: &[u8]) -> Result<PathBuf, AppError> {
        let path = self.dir.join(storage_filename);
        tokio::fs::write(&path, data).await.map_err(|e| {
            AppError::Internal(format!("Failed to stage upload {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), size_bytes = data.len(), "Upload staged");
        Ok(path)
    }

    /// Remove a staged file, best effort. A leftover file is only wasted
    /// disk, never a correctness problem.
    pub async fn remove(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Failed to remove staged file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("staging")).await.unwrap();

        let path = staging.write("abc.txt", b"hello").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");

        staging.remove(&path).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_overwrites_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).await.unwrap();

        staging.write("same.bin", b"first").await.unwrap();
        let path = staging.write("same.bin", b"second").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).await.unwrap();
        staging.remove(&dir.path().join("never-written")).await;
    }
}
