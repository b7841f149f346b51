use std::sync::Arc;

use crate::local::LocalObjectStore;
use crate::s3::S3ObjectStore;
use crate::traits::{ObjectStore, StorageError, StorageResult};
use conveyor_core::{Config, StorageBackend};

/// Build the object store selected by configuration.
///
/// Handlers and the transfer worker only ever see `Arc<dyn ObjectStore>`,
/// so backends can be swapped (or faked in tests) without touching callers.
pub async fn create_object_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;

            let store = S3ObjectStore::new(bucket, region, config.s3_endpoint.clone()).await?;

            tracing::info!(backend = %StorageBackend::S3, "Object store initialized");
            Ok(Arc::new(store))
        }
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            let store = LocalObjectStore::new(base_path, base_url).await?;

            tracing::info!(backend = %StorageBackend::Local, "Object store initialized");
            Ok(Arc::new(store))
        }
    }
}
