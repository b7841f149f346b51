//! Object store abstraction
//!
//! This module defines the ObjectStore trait that remote storage backends
//! implement. The transfer worker and the delete path program against it,
//! never against a concrete backend.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use conveyor_core::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A successfully mirrored object.
///
/// `remote_id` is the backend's opaque handle (the e-tag for S3-compatible
/// stores, the object name for the local backend); `remote_name` is the
/// destination name the object lives under; `public_url` is where clients
/// can fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub remote_id: String,
    pub remote_name: String,
    pub public_url: String,
    pub content_type: String,
}

/// Object store abstraction
///
/// Backends mirror locally staged files to remote storage. Destination
/// names are flat (no path separators expected); uploading the same name
/// twice overwrites, which is what makes transfer redelivery idempotent.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local_path` under `destination_name`.
    async fn upload(
        &self,
        local_path: &Path,
        destination_name: &str,
        content_type: &str,
    ) -> StorageResult<StoredObject>;

    /// Delete a remote object. Deleting an object that does not exist is
    /// not an error; callers treat any failure as best-effort.
    async fn delete(&self, remote_id: &str, remote_name: &str) -> StorageResult<()>;

    /// Public URL for a remote object. Pure lookup, no network call.
    fn download_url(&self, remote_name: &str) -> String;

    /// Check if a remote object exists
    async fn exists(&self, remote_name: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
