//! Upload endpoint.
//!
//! Accepts a multipart form with a `file` field and an optional
//! `uploaded_by` field. The file stream is aborted as soon as it crosses
//! the configured size ceiling rather than buffered to completion.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use conveyor_core::models::{FileRecord, UploadStatus};
use conveyor_core::{AppError, ValidationError};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct FileUploadResponse {
    pub file_id: Uuid,
    /// Generated storage name, also the destination name in the object store.
    pub filename: String,
    pub file_size: i64,
    pub content_type: String,
    pub upload_status: UploadStatus,
    /// Set once the transfer has completed. For a deduplicated upload this
    /// is the existing file's URL and may already be present.
    pub public_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileUploadResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            file_id: record.id,
            filename: record.filename,
            file_size: record.file_size,
            content_type: record.content_type,
            upload_status: record.upload_status,
            public_url: record.public_url,
            created_at: record.created_at,
        }
    }
}

struct UploadForm {
    data: Vec<u8>,
    original_filename: String,
    content_type: String,
    uploaded_by: Option<String>,
}

/// Read the multipart form. The file stream is capped at `max_size`; the
/// read stops with a 413 as soon as the running total crosses it.
async fn read_upload_form(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<UploadForm, AppError> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut uploaded_by: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple 'file' fields provided".to_string(),
                    ));
                }

                let original_filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        AppError::InvalidInput("File field has no filename".to_string())
                    })?;
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })? {
                    if data.len() + chunk.len() > max_size {
                        return Err(AppError::Validation(ValidationError::FileTooLarge {
                            size: data.len() + chunk.len(),
                            max: max_size,
                        }));
                    }
                    data.extend_from_slice(&chunk);
                }

                file = Some((data, original_filename, content_type));
            }
            "uploaded_by" => {
                let value = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read uploaded_by field: {}", e))
                })?;
                uploaded_by = Some(value).filter(|s| !s.trim().is_empty());
            }
            _ => {}
        }
    }

    let (data, original_filename, content_type) =
        file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    Ok(UploadForm {
        data,
        original_filename,
        content_type,
        uploaded_by,
    })
}

/// Accept an upload, deduplicate it by content hash, and queue its
/// transfer to the object store.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload admitted or deduplicated onto an existing file", body = FileUploadResponse),
        (status = 400, description = "Invalid input or disallowed file type", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_upload_form(multipart, state.config.max_file_size_bytes).await?;

    let admitted = state
        .admission
        .admit(
            &form.data,
            &form.original_filename,
            &form.content_type,
            form.uploaded_by.as_deref(),
        )
        .await?;

    Ok(Json(FileUploadResponse::from(admitted.record)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            filename: "abc.pdf".to_string(),
            original_filename: "report.pdf".to_string(),
            file_size: 1024,
            content_type: "application/pdf".to_string(),
            content_hash: "deadbeef".to_string(),
            upload_status: UploadStatus::Pending,
            remote_object_id: None,
            remote_object_name: None,
            public_url: None,
            uploaded_by: Some("alice".to_string()),
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_upload_response_from_record() {
        let record = sample_record();
        let id = record.id;
        let response = FileUploadResponse::from(record);
        assert_eq!(response.file_id, id);
        assert_eq!(response.filename, "abc.pdf");
        assert_eq!(response.upload_status, UploadStatus::Pending);
        assert!(response.public_url.is_none());
    }

    #[test]
    fn test_upload_response_serializes_pending_status() {
        let response = FileUploadResponse::from(sample_record());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["upload_status"], "pending");
        // public_url is present as null until the transfer completes
        assert!(value["public_url"].is_null());
    }
}
