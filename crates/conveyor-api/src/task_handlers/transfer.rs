//! Transfer task handler.
//!
//! Drives one file through its upload state machine: mark `uploading`,
//! mirror the staged bytes to the object store, persist the remote
//! coordinates and public URL, then drop the staged copy. Redelivery is
//! idempotent because the destination name is the stored filename; a
//! repeated upload overwrites the same object.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use conveyor_core::models::TransferTask;
use conveyor_core::TaskError;
use conveyor_storage::StorageError;

use crate::state::AppState;
use crate::task_handlers::TaskHandler;

pub struct TransferTaskHandler;

/// Decide whether a storage failure is worth retrying. A missing staging
/// file or a misconfigured backend cannot recover; network and backend
/// trouble can.
fn classify_storage_error(err: StorageError) -> TaskError {
    match err {
        StorageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            TaskError::unrecoverable(anyhow::Error::new(io).context("Staging file missing"))
        }
        StorageError::ConfigError(_) | StorageError::InvalidName(_) => {
            TaskError::unrecoverable(anyhow::Error::new(err))
        }
        other => TaskError::recoverable(anyhow::Error::new(other)),
    }
}

#[async_trait]
impl TaskHandler for TransferTaskHandler {
    #[tracing::instrument(
        skip(self, task, state),
        fields(task.id = %task.id, file.id = %task.file_id)
    )]
    async fn process(&self, task: &TransferTask, state: Arc<AppState>) -> Result<()> {
        let staging_path = Path::new(&task.staging_path);

        // The guarded update doubles as the existence check: a missing,
        // deleted, or already-completed record comes back as None.
        let record = match state
            .db
            .files
            .mark_uploading(task.file_id)
            .await
            .context("Failed to mark file uploading")?
        {
            Some(record) => record,
            None => {
                tracing::info!(
                    file_id = %task.file_id,
                    "File missing, deleted, or already transferred; dropping task"
                );
                state.storage.staging.remove(staging_path).await;
                return Ok(());
            }
        };

        let stored = match state
            .storage
            .store
            .upload(staging_path, &record.filename, &record.content_type)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                // The record shows failed for every unsuccessful attempt;
                // a retry flips it back to uploading.
                if let Err(mark_err) = state.db.files.mark_failed(record.id).await {
                    tracing::error!(
                        file_id = %record.id,
                        error = %mark_err,
                        "Failed to mark file failed after transfer error"
                    );
                }
                return Err(classify_storage_error(e).into());
            }
        };

        match state
            .db
            .files
            .complete_transfer(
                record.id,
                &stored.remote_id,
                &stored.remote_name,
                &stored.public_url,
            )
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Deleted while the bytes were in flight. The record stays
                // deleted; remove the object that was just uploaded.
                tracing::warn!(
                    file_id = %record.id,
                    "File was deleted during transfer, removing uploaded object"
                );
                if let Err(e) = state
                    .storage
                    .store
                    .delete(&stored.remote_id, &stored.remote_name)
                    .await
                {
                    tracing::warn!(
                        remote_object_name = %stored.remote_name,
                        error = %e,
                        "Failed to remove orphaned remote object"
                    );
                }
                state.storage.staging.remove(staging_path).await;
                return Ok(());
            }
            Err(e) => {
                if let Err(mark_err) = state.db.files.mark_failed(record.id).await {
                    tracing::error!(
                        file_id = %record.id,
                        error = %mark_err,
                        "Failed to mark file failed after persist error"
                    );
                }
                return Err(anyhow::Error::new(e).context("Failed to persist transfer result"));
            }
        }

        // Staged bytes are only removed once the result is durable.
        state.storage.staging.remove(staging_path).await;

        tracing::info!(
            file_id = %record.id,
            remote_object_name = %stored.remote_name,
            "Transfer completed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_staging_file_is_unrecoverable() {
        let err = StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert!(!classify_storage_error(err).is_recoverable());
    }

    #[test]
    fn test_config_error_is_unrecoverable() {
        let err = StorageError::ConfigError("bad credentials".to_string());
        assert!(!classify_storage_error(err).is_recoverable());
    }

    #[test]
    fn test_upload_failure_is_recoverable() {
        let err = StorageError::UploadFailed("connection reset by peer".to_string());
        assert!(classify_storage_error(err).is_recoverable());
    }

    #[test]
    fn test_other_io_errors_are_recoverable() {
        let err = StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(classify_storage_error(err).is_recoverable());
    }
}
