use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::traits::{ObjectStore, StorageError, StorageResult, StoredObject};
use conveyor_core::StorageBackend;

/// Local filesystem store, for development and tests
#[derive(Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    /// Create a new LocalObjectStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored objects (e.g., "/var/lib/conveyor/files")
    /// * `base_url` - Base URL objects are served under (e.g., "http://localhost:8000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalObjectStore {
            base_path,
            base_url,
        })
    }

    /// Convert a destination name to a filesystem path.
    ///
    /// Names must not escape the base directory; destination names are flat
    /// generated filenames, so anything with traversal sequences is rejected.
    fn name_to_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.contains("..") || name.starts_with('/') {
            return Err(StorageError::InvalidName(
                "Object name contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(name))
    }

    fn generate_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        local_path: &Path,
        destination_name: &str,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let target = self.name_to_path(destination_name)?;
        let start = std::time::Instant::now();

        // A missing source stays an io error so callers can tell it apart
        // from a storage-side failure.
        let size = fs::copy(local_path, &target).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::IoError(e)
            } else {
                StorageError::UploadFailed(format!(
                    "Failed to copy {} to {}: {}",
                    local_path.display(),
                    target.display(),
                    e
                ))
            }
        })?;

        let url = self.generate_url(destination_name);

        tracing::info!(
            path = %target.display(),
            name = %destination_name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store upload successful"
        );

        Ok(StoredObject {
            remote_id: destination_name.to_string(),
            remote_name: destination_name.to_string(),
            public_url: url,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, _remote_id: &str, remote_name: &str) -> StorageResult<()> {
        let path = self.name_to_path(remote_name)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            name = %remote_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store delete successful"
        );

        Ok(())
    }

    fn download_url(&self, remote_name: &str) -> String {
        self.generate_url(remote_name)
    }

    async fn exists(&self, remote_name: &str) -> StorageResult<bool> {
        let path = self.name_to_path(remote_name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_store(dir: &Path) -> LocalObjectStore {
        LocalObjectStore::new(dir, "http://localhost:8000/files".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_copies_staged_file() {
        let staging = tempdir().unwrap();
        let storage_dir = tempdir().unwrap();
        let store = test_store(storage_dir.path()).await;

        let staged = staging.path().join("staged.txt");
        tokio::fs::write(&staged, b"mirrored bytes").await.unwrap();

        let stored = store
            .upload(&staged, "abc123.txt", "text/plain")
            .await
            .unwrap();

        assert_eq!(stored.remote_name, "abc123.txt");
        assert_eq!(stored.remote_id, "abc123.txt");
        assert_eq!(stored.public_url, "http://localhost:8000/files/abc123.txt");
        assert_eq!(stored.content_type, "text/plain");

        let mirrored = tokio::fs::read(storage_dir.path().join("abc123.txt"))
            .await
            .unwrap();
        assert_eq!(mirrored, b"mirrored bytes");

        // The staged source stays in place; deleting it is the caller's job.
        assert!(tokio::fs::try_exists(&staged).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_same_name_overwrites() {
        let staging = tempdir().unwrap();
        let storage_dir = tempdir().unwrap();
        let store = test_store(storage_dir.path()).await;

        let first = staging.path().join("first.txt");
        tokio::fs::write(&first, b"first").await.unwrap();
        store.upload(&first, "same.txt", "text/plain").await.unwrap();

        let second = staging.path().join("second.txt");
        tokio::fs::write(&second, b"second").await.unwrap();
        store
            .upload(&second, "same.txt", "text/plain")
            .await
            .unwrap();

        let mirrored = tokio::fs::read(storage_dir.path().join("same.txt"))
            .await
            .unwrap();
        assert_eq!(mirrored, b"second");
    }

    #[tokio::test]
    async fn test_traversal_names_rejected() {
        let storage_dir = tempdir().unwrap();
        let store = test_store(storage_dir.path()).await;

        let result = store.delete("", "../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));

        let result = store.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let storage_dir = tempdir().unwrap();
        let store = test_store(storage_dir.path()).await;

        assert!(store.delete("", "nonexistent.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_exists_after_upload_and_delete() {
        let staging = tempdir().unwrap();
        let storage_dir = tempdir().unwrap();
        let store = test_store(storage_dir.path()).await;

        let staged = staging.path().join("staged.bin");
        tokio::fs::write(&staged, b"x").await.unwrap();

        let stored = store
            .upload(&staged, "present.bin", "application/octet-stream")
            .await
            .unwrap();
        assert!(store.exists(&stored.remote_name).await.unwrap());

        store
            .delete(&stored.remote_id, &stored.remote_name)
            .await
            .unwrap();
        assert!(!store.exists(&stored.remote_name).await.unwrap());
    }

    #[tokio::test]
    async fn test_download_url_shape() {
        let storage_dir = tempdir().unwrap();
        let store = LocalObjectStore::new(
            storage_dir.path(),
            // Trailing slash must not double up in URLs
            "http://localhost:8000/files/".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(
            store.download_url("abc.jpg"),
            "http://localhost:8000/files/abc.jpg"
        );
    }
}
