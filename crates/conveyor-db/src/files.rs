use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use conveyor_core::models::FileRecord;
use conveyor_core::AppError;

/// Result of a deduplicating insert.
///
/// `deduplicated` is true when the insert lost the unique race on
/// `content_hash` and the returned record is the live row that won.
pub struct FileCreateOutcome {
    pub record: FileRecord,
    pub deduplicated: bool,
}

/// Repository for uploaded file metadata.
///
/// Status updates are guarded in SQL so a row can only move along the
/// allowed transitions (pending -> uploading -> completed/failed,
/// failed -> uploading on retry). A guard that matches no row returns
/// `None` instead of clobbering concurrent progress.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new file record, coalescing on duplicate content.
    ///
    /// The partial unique index on `content_hash` (live rows only) makes
    /// concurrent uploads of identical bytes race; the loser re-queries
    /// the winner and reports it as a dedup hit.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "insert"))]
    pub async fn create(
        &self,
        id: Uuid,
        filename: &str,
        original_filename: &str,
        file_size: i64,
        content_type: &str,
        content_hash: &str,
        uploaded_by: Option<&str>,
    ) -> Result<FileCreateOutcome, AppError> {
        let inserted: Result<FileRecord, sqlx::Error> = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            INSERT INTO files (
                id, filename, original_filename, file_size, content_type,
                content_hash, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(filename)
        .bind(original_filename)
        .bind(file_size)
        .bind(content_type)
        .bind(content_hash)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(record) => Ok(FileCreateOutcome {
                record,
                deduplicated: false,
            }),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(
                    content_hash = %content_hash,
                    "Duplicate content raced a concurrent upload, returning winner"
                );
                match self.find_active_by_hash(content_hash).await? {
                    Some(record) => Ok(FileCreateOutcome {
                        record,
                        deduplicated: true,
                    }),
                    // Winner was deleted between the violation and the
                    // re-query; surface as retryable.
                    None => Err(AppError::Database(e)),
                }
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Fetch a live (not soft-deleted) file by id.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            "SELECT * FROM files WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Fetch the live file holding the given content hash, if any.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn find_active_by_hash(
        &self,
        content_hash: &str,
    ) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            "SELECT * FROM files WHERE content_hash = $1 AND NOT is_deleted",
        )
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// List live files, newest first, optionally filtered by uploader.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
        uploaded_by: Option<&str>,
    ) -> Result<Vec<FileRecord>, AppError> {
        let records: Vec<FileRecord> = match uploaded_by {
            None => {
                sqlx::query_as::<Postgres, FileRecord>(
                    "SELECT * FROM files WHERE NOT is_deleted ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            Some(uploader) => {
                sqlx::query_as::<Postgres, FileRecord>(
                    "SELECT * FROM files WHERE NOT is_deleted AND uploaded_by = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(uploader)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records)
    }

    /// Count live files, optionally filtered by uploader.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn count(&self, uploaded_by: Option<&str>) -> Result<i64, AppError> {
        let count: i64 = match uploaded_by {
            None => {
                sqlx::query_scalar::<Postgres, i64>(
                    "SELECT COUNT(*) FROM files WHERE NOT is_deleted",
                )
                .fetch_one(&self.pool)
                .await?
            }
            Some(uploader) => {
                sqlx::query_scalar::<Postgres, i64>(
                    "SELECT COUNT(*) FROM files WHERE NOT is_deleted AND uploaded_by = $1",
                )
                .bind(uploader)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(count)
    }

    /// Move a file into `uploading` when a transfer attempt starts.
    ///
    /// Returns `None` when the row is missing, deleted, or already
    /// `completed`. A row still in `uploading` is a redelivered attempt
    /// whose predecessor died mid-transfer; restarting it is safe because
    /// destination names are stable.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "update"))]
    pub async fn mark_uploading(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            UPDATE files
            SET upload_status = 'uploading',
                updated_at = NOW()
            WHERE id = $1
                AND upload_status <> 'completed'
                AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Record a finished transfer: remote coordinates, public URL, `completed`.
    ///
    /// Returns `None` when the row was deleted mid-transfer or is no longer
    /// `uploading`; the caller owns cleanup of the orphaned remote object.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "update"))]
    pub async fn complete_transfer(
        &self,
        id: Uuid,
        remote_object_id: &str,
        remote_object_name: &str,
        public_url: &str,
    ) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            UPDATE files
            SET upload_status = 'completed',
                remote_object_id = $2,
                remote_object_name = $3,
                public_url = $4,
                updated_at = NOW()
            WHERE id = $1
                AND upload_status = 'uploading'
                AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(remote_object_id)
        .bind(remote_object_name)
        .bind(public_url)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref record) = record {
            tracing::info!(
                file_id = %record.id,
                remote_object_name = %remote_object_name,
                "File transfer completed"
            );
        }

        Ok(record)
    }

    /// Mark a file `failed` after its transfer exhausted all retries.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "update"))]
    pub async fn mark_failed(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            UPDATE files
            SET upload_status = 'failed',
                updated_at = NOW()
            WHERE id = $1
                AND upload_status IN ('pending', 'uploading')
                AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Soft-delete a live file.
    ///
    /// Flipping `is_deleted` frees the content hash for future uploads;
    /// remote bytes are cleaned up by the caller afterwards, best effort.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "update"))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            UPDATE files
            SET is_deleted = TRUE,
                updated_at = NOW()
            WHERE id = $1
                AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref record) = record {
            tracing::info!(file_id = %record.id, "File soft-deleted");
        }

        Ok(record)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
