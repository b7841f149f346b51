//! Remote store backed by any S3-compatible service.

use std::path::Path as FilePath;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload};

use crate::traits::{ObjectStore, StorageError, StorageResult, StoredObject};
use conveyor_core::StorageBackend;

#[derive(Clone)]
pub struct S3ObjectStore {
    store: AmazonS3,
    bucket: String,
    region: String,
    /// Set for non-AWS providers (MinIO, Backblaze B2); plain AWS when absent.
    endpoint_url: Option<String>,
}

impl S3ObjectStore {
    /// Credentials come from the environment (`AWS_ACCESS_KEY_ID` and
    /// friends); bucket, region and endpoint are passed in explicitly so
    /// the service config stays their single source of truth.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket.as_str())
            .with_region(region.as_str());

        if let Some(endpoint) = &endpoint_url {
            builder = builder
                .with_endpoint(endpoint.as_str())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    fn generate_url(&self, name: &str) -> String {
        format_object_url(&self.bucket, &self.region, self.endpoint_url.as_deref(), name)
    }
}

/// Public URL for an object.
///
/// With a custom endpoint the URL is path-style ({endpoint}/{bucket}/{name})
/// for compatibility across S3-compatible providers; plain AWS gets the
/// virtual-hosted-style https://{bucket}.s3.{region}.amazonaws.com/{name}.
fn format_object_url(bucket: &str, region: &str, endpoint_url: Option<&str>, name: &str) -> String {
    if let Some(endpoint) = endpoint_url {
        let base_url = endpoint.trim_end_matches('/');
        format!("{}/{}/{}", base_url, bucket, name)
    } else {
        format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, name)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        local_path: &FilePath,
        destination_name: &str,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let data = tokio::fs::read(local_path).await?;
        let size = data.len() as u64;
        let location = Path::from(destination_name.to_string());
        let payload = PutPayload::from(Bytes::from(data));

        let start = Instant::now();
        let put_result = self.store.put(&location, payload).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                name = %destination_name,
                size_bytes = size,
                duration_ms = elapsed_ms(start),
                "Upload to S3 failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            name = %destination_name,
            size_bytes = size,
            duration_ms = elapsed_ms(start),
            "Uploaded to S3"
        );

        Ok(StoredObject {
            remote_id: put_result
                .e_tag
                .unwrap_or_else(|| destination_name.to_string()),
            remote_name: destination_name.to_string(),
            public_url: self.generate_url(destination_name),
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, remote_id: &str, remote_name: &str) -> StorageResult<()> {
        let location = Path::from(remote_name.to_string());
        let start = Instant::now();

        // An object that is already gone counts as deleted; the caller only
        // cares that nothing remains under the name.
        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(
                    bucket = %self.bucket,
                    name = %remote_name,
                    duration_ms = elapsed_ms(start),
                    "Deleted from S3"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    name = %remote_name,
                    remote_id = %remote_id,
                    duration_ms = elapsed_ms(start),
                    "Delete from S3 failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    fn download_url(&self, remote_name: &str) -> String {
        self.generate_url(remote_name)
    }

    async fn exists(&self, remote_name: &str) -> StorageResult<bool> {
        match self.store.head(&Path::from(remote_name.to_string())).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_virtual_hosted_style_for_aws() {
        let url = format_object_url("uploads", "us-east-1", None, "abc.jpg");
        assert_eq!(url, "https://uploads.s3.us-east-1.amazonaws.com/abc.jpg");
    }

    #[test]
    fn test_url_path_style_for_custom_endpoint() {
        let url = format_object_url(
            "uploads",
            "us-west-004",
            Some("https://s3.us-west-004.backblazeb2.com"),
            "abc.jpg",
        );
        assert_eq!(url, "https://s3.us-west-004.backblazeb2.com/uploads/abc.jpg");
    }

    #[test]
    fn test_url_trims_endpoint_trailing_slash() {
        let url = format_object_url("uploads", "local", Some("http://localhost:9000/"), "abc.jpg");
        assert_eq!(url, "http://localhost:9000/uploads/abc.jpg");
    }
}
