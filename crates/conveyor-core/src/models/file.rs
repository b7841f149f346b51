use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of an uploaded file's remote mirror.
///
/// Status only moves forward: `pending -> uploading -> {completed, failed}`,
/// with `failed -> uploading` re-entry when a transfer attempt is retried.
/// A record never reaches `completed` without a successful remote upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, utoipa::ToSchema)]
#[sqlx(type_name = "upload_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
}

impl UploadStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    /// Mirrors the `WHERE upload_status IN (...)` guards in the repository.
    pub fn can_transition_to(self, next: UploadStatus) -> bool {
        matches!(
            (self, next),
            (UploadStatus::Pending, UploadStatus::Uploading)
                | (UploadStatus::Pending, UploadStatus::Failed)
                | (UploadStatus::Uploading, UploadStatus::Completed)
                | (UploadStatus::Uploading, UploadStatus::Failed)
                | (UploadStatus::Failed, UploadStatus::Uploading)
        )
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "uploading" => Ok(UploadStatus::Uploading),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid upload status: {}", s)),
        }
    }
}

/// A stored file's metadata row.
///
/// `filename` is the generated storage name (`{uuid}.{ext}`) and doubles as
/// the remote destination name, which makes transfer redelivery idempotent.
/// `remote_object_id`, `remote_object_name` and `public_url` are set only
/// once the transfer completes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub content_type: String,
    pub content_hash: String,
    pub upload_status: UploadStatus,
    pub remote_object_id: Option<String>,
    pub remote_object_name: Option<String>,
    pub public_url: Option<String>,
    pub uploaded_by: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn is_completed(&self) -> bool {
        self.upload_status == UploadStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_status_display() {
        assert_eq!(UploadStatus::Pending.to_string(), "pending");
        assert_eq!(UploadStatus::Uploading.to_string(), "uploading");
        assert_eq!(UploadStatus::Completed.to_string(), "completed");
        assert_eq!(UploadStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_upload_status_from_str() {
        assert_eq!(
            "pending".parse::<UploadStatus>().unwrap(),
            UploadStatus::Pending
        );
        assert_eq!(
            "uploading".parse::<UploadStatus>().unwrap(),
            UploadStatus::Uploading
        );
        assert_eq!(
            "completed".parse::<UploadStatus>().unwrap(),
            UploadStatus::Completed
        );
        assert_eq!(
            "failed".parse::<UploadStatus>().unwrap(),
            UploadStatus::Failed
        );
        assert!("done".parse::<UploadStatus>().is_err());
    }

    #[test]
    fn test_status_transitions_forward() {
        assert!(UploadStatus::Pending.can_transition_to(UploadStatus::Uploading));
        assert!(UploadStatus::Pending.can_transition_to(UploadStatus::Failed));
        assert!(UploadStatus::Uploading.can_transition_to(UploadStatus::Completed));
        assert!(UploadStatus::Uploading.can_transition_to(UploadStatus::Failed));
    }

    #[test]
    fn test_status_retry_reenters_uploading() {
        assert!(UploadStatus::Failed.can_transition_to(UploadStatus::Uploading));
    }

    #[test]
    fn test_status_never_leaves_completed() {
        assert!(!UploadStatus::Completed.can_transition_to(UploadStatus::Pending));
        assert!(!UploadStatus::Completed.can_transition_to(UploadStatus::Uploading));
        assert!(!UploadStatus::Completed.can_transition_to(UploadStatus::Failed));
    }

    #[test]
    fn test_status_rejects_backward_and_skipping_moves() {
        assert!(!UploadStatus::Pending.can_transition_to(UploadStatus::Completed));
        assert!(!UploadStatus::Uploading.can_transition_to(UploadStatus::Pending));
        assert!(!UploadStatus::Failed.can_transition_to(UploadStatus::Completed));
        assert!(!UploadStatus::Failed.can_transition_to(UploadStatus::Pending));
    }

    #[test]
    fn test_upload_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(UploadStatus::Pending).unwrap(),
            serde_json::json!("pending")
        );
        assert_eq!(
            serde_json::to_value(UploadStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
    }
}
