//! Upload admission pipeline.
//!
//! Admission validates an upload, deduplicates it by content hash, persists
//! its metadata, stages its bytes locally, and enqueues the transfer that
//! will mirror them to the object store. The remote store is never touched
//! on this path; a successful admission only guarantees durable metadata,
//! staged bytes, and a queued task.

use uuid::Uuid;

use conveyor_core::{sha256_hex, AppError, UploadValidator};
use conveyor_core::models::FileRecord;
use conveyor_db::{FileRepository, TaskRepository};

use crate::staging::StagingArea;

/// Outcome of a successful admission.
pub struct AdmittedUpload {
    pub record: FileRecord,
    /// True when the content matched an existing live file and no new
    /// record or transfer was created.
    pub deduplicated: bool,
}

#[derive(Clone)]
pub struct UploadAdmissionService {
    files: FileRepository,
    tasks: TaskRepository,
    staging: StagingArea,
    validator: UploadValidator,
    transfer_max_attempts: i32,
}

impl UploadAdmissionService {
    pub fn new(
        files: FileRepository,
        tasks: TaskRepository,
        staging: StagingArea,
        validator: UploadValidator,
        transfer_max_attempts: i32,
    ) -> Self {
        Self {
            files,
            tasks,
            staging,
            validator,
            transfer_max_attempts,
        }
    }

    /// Admit one upload.
    ///
    /// Identical bytes to a live file return that file's record unchanged;
    /// no duplicate record, staging copy, or transfer task is created. Two
    /// concurrent uploads of the same new content race on the content-hash
    /// unique index and the loser is handed the winner's record.
    #[tracing::instrument(
        skip(self, data),
        fields(original_filename = %original_filename, size_bytes = data.len())
    )]
    pub async fn admit(
        &self,
        data: &[u8],
        original_filename: &str,
        content_type: &str,
        uploaded_by: Option<&str>,
    ) -> Result<AdmittedUpload, AppError> {
        self.validator.validate_size(data.len())?;
        let extension = self.validator.validate_filename(original_filename)?;

        let content_hash = sha256_hex(data);

        if let Some(existing) = self.files.find_active_by_hash(&content_hash).await? {
            tracing::info!(
                file_id = %existing.id,
                content_hash = %content_hash,
                "Duplicate content, returning existing file"
            );
            return Ok(AdmittedUpload {
                record: existing,
                deduplicated: true,
            });
        }

        let id = Uuid::new_v4();
        let storage_filename = format!("{}.{}", id, extension);

        let outcome = self
            .files
            .create(
                id,
                &storage_filename,
                original_filename,
                data.len() as i64,
                content_type,
                &content_hash,
                uploaded_by,
            )
            .await?;
        if outcome.deduplicated {
            return Ok(AdmittedUpload {
                record: outcome.record,
                deduplicated: true,
            });
        }
        let record = outcome.record;

        let staging_path = match self.staging.write(&record.filename, data).await {
            Ok(path) => path,
            Err(e) => {
                self.mark_failed_best_effort(record.id, "staging error").await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .tasks
            .enqueue(
                record.id,
                &staging_path.to_string_lossy(),
                self.transfer_max_attempts,
            )
            .await
        {
            self.mark_failed_best_effort(record.id, "enqueue error").await;
            self.staging.remove(&staging_path).await;
            return Err(AppError::from(e));
        }

        tracing::info!(
            file_id = %record.id,
            filename = %record.filename,
            size_bytes = record.file_size,
            "Upload admitted"
        );

        Ok(AdmittedUpload {
            record,
            deduplicated: false,
        })
    }

    /// The record must not stay `pending` with no queued transfer behind it.
    async fn mark_failed_best_effort(&self, file_id: Uuid, cause: &str) {
        if let Err(e) = self.files.mark_failed(file_id).await {
            tracing::error!(
                file_id = %file_id,
                cause = cause,
                error = %e,
                "Failed to mark file failed after admission error"
            );
        }
    }
}
