//! File metadata endpoints: fetch, list, delete, download URL.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use conveyor_core::models::{FileRecord, UploadStatus};
use conveyor_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Full client-visible view of a file record.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileInfo {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub content_type: String,
    pub content_hash: String,
    pub upload_status: UploadStatus,
    pub public_url: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<FileRecord> for FileInfo {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            original_filename: record.original_filename,
            file_size: record.file_size,
            content_type: record.content_type,
            content_hash: record.content_hash,
            upload_status: record.upload_status,
            public_url: record.public_url,
            uploaded_by: record.uploaded_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileInfo>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadUrlResponse {
    pub download_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FileListQuery {
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    pub page: i64,
    /// Page size, 1 to 100
    #[serde(default = "default_size")]
    pub size: i64,
    /// Only list files uploaded by this identity
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    50
}

fn validate_pagination(page: i64, size: i64) -> Result<(), AppError> {
    if page < 1 {
        return Err(AppError::InvalidQuery(format!(
            "page must be >= 1, got {}",
            page
        )));
    }
    if !(1..=100).contains(&size) {
        return Err(AppError::InvalidQuery(format!(
            "size must be between 1 and 100, got {}",
            size
        )));
    }
    Ok(())
}

/// Fetch one file's metadata.
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileInfo),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .db
        .files
        .find_by_id(id)
        .await
        .map_err(HttpAppError::from)?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    Ok(Json(FileInfo::from(record)))
}

/// List files, newest first.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    params(FileListQuery),
    responses(
        (status = 200, description = "Page of files", body = FileListResponse),
        (status = 422, description = "Invalid pagination parameters", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_pagination(query.page, query.size)?;

    let offset = (query.page - 1) * query.size;
    let uploaded_by = query.uploaded_by.as_deref();

    let records = state
        .db
        .files
        .list(query.size, offset, uploaded_by)
        .await
        .map_err(HttpAppError::from)?;
    let total = state
        .db
        .files
        .count(uploaded_by)
        .await
        .map_err(HttpAppError::from)?;

    Ok(Json(FileListResponse {
        files: records.into_iter().map(FileInfo::from).collect(),
        total,
        page: query.page,
        size: query.size,
    }))
}

/// Soft-delete a file.
///
/// The record disappears from reads immediately and its content hash is
/// freed for future uploads. The remote object, if any, is removed best
/// effort in the background; a failure there leaks bytes, never state.
#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .db
        .files
        .soft_delete(id)
        .await
        .map_err(HttpAppError::from)?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if let (Some(remote_id), Some(remote_name)) =
        (record.remote_object_id.clone(), record.remote_object_name.clone())
    {
        let store = state.storage.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.delete(&remote_id, &remote_name).await {
                tracing::warn!(
                    remote_object_name = %remote_name,
                    error = %e,
                    "Failed to delete remote object for deleted file"
                );
            }
        });
    }

    tracing::info!(file_id = %record.id, "File deleted");

    Ok(Json(DeleteResponse {
        message: "File deleted successfully".to_string(),
    }))
}

/// Resolve a file's public download URL.
#[utoipa::path(
    get,
    path = "/files/{id}/download",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Public download URL", body = DownloadUrlResponse),
        (status = 404, description = "File not found or not yet transferred", body = ErrorResponse)
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .db
        .files
        .find_by_id(id)
        .await
        .map_err(HttpAppError::from)?;

    let download_url = record
        .and_then(|r| r.public_url)
        .ok_or_else(|| AppError::NotFound("File not found or not uploaded".to_string()))?;

    Ok(Json(DownloadUrlResponse { download_url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::ErrorMetadata;

    #[test]
    fn test_pagination_defaults_are_valid() {
        assert!(validate_pagination(default_page(), default_size()).is_ok());
    }

    #[test]
    fn test_pagination_rejects_zero_page() {
        let err = validate_pagination(0, 50).unwrap_err();
        assert_eq!(err.http_status_code(), 422);
    }

    #[test]
    fn test_pagination_rejects_negative_page() {
        assert!(validate_pagination(-3, 50).is_err());
    }

    #[test]
    fn test_pagination_rejects_size_out_of_range() {
        assert!(validate_pagination(1, 0).is_err());
        assert!(validate_pagination(1, 101).is_err());
        assert!(validate_pagination(1, 1).is_ok());
        assert!(validate_pagination(1, 100).is_ok());
    }

    #[test]
    fn test_file_info_serializes_nullable_fields_as_null() {
        let info = FileInfo {
            id: Uuid::new_v4(),
            filename: "a.txt".to_string(),
            original_filename: "notes.txt".to_string(),
            file_size: 5,
            content_type: "text/plain".to_string(),
            content_hash: "abc".to_string(),
            upload_status: UploadStatus::Pending,
            public_url: None,
            uploaded_by: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let value = serde_json::to_value(&info).unwrap();
        assert!(value["public_url"].is_null());
        assert!(value["uploaded_by"].is_null());
        assert_eq!(value["upload_status"], "pending");
    }
}
