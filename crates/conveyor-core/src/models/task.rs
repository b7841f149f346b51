use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "transfer_task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferTaskStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl Display for TransferTaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransferTaskStatus::Pending => write!(f, "pending"),
            TransferTaskStatus::Scheduled => write!(f, "scheduled"),
            TransferTaskStatus::Running => write!(f, "running"),
            TransferTaskStatus::Completed => write!(f, "completed"),
            TransferTaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TransferTaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferTaskStatus::Pending),
            "scheduled" => Ok(TransferTaskStatus::Scheduled),
            "running" => Ok(TransferTaskStatus::Running),
            "completed" => Ok(TransferTaskStatus::Completed),
            "failed" => Ok(TransferTaskStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid transfer task status: {}", s)),
        }
    }
}

/// One durable unit of transfer work: mirror the staged bytes of `file_id`
/// to the remote object store.
///
/// `attempt_count` counts finished attempts; `scheduled_at` carries the
/// retry backoff. `pending` and due `scheduled` tasks are claimable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransferTask {
    pub id: Uuid,
    pub file_id: Uuid,
    pub staging_path: String,
    pub status: TransferTaskStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TransferTask {
    pub fn is_ready_to_run(&self) -> bool {
        matches!(
            self.status,
            TransferTaskStatus::Pending | TransferTaskStatus::Scheduled
        ) && self.scheduled_at <= Utc::now()
    }

    pub fn can_retry(&self) -> bool {
        self.attempt_count < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_task(status: TransferTaskStatus, attempt_count: i32) -> TransferTask {
        TransferTask {
            id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
            staging_path: "./temp_uploads/test.jpg".to_string(),
            status,
            attempt_count,
            max_attempts: 3,
            scheduled_at: Utc::now() - chrono::Duration::seconds(10),
            claimed_at: None,
            completed_at: None,
            last_error: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_status_display_round_trip() {
        for status in [
            TransferTaskStatus::Pending,
            TransferTaskStatus::Scheduled,
            TransferTaskStatus::Running,
            TransferTaskStatus::Completed,
            TransferTaskStatus::Failed,
        ] {
            assert_eq!(
                status.to_string().parse::<TransferTaskStatus>().unwrap(),
                status
            );
        }
        assert!("cancelled".parse::<TransferTaskStatus>().is_err());
    }

    #[test]
    fn test_pending_task_is_ready() {
        assert!(test_task(TransferTaskStatus::Pending, 0).is_ready_to_run());
    }

    #[test]
    fn test_due_scheduled_task_is_ready() {
        assert!(test_task(TransferTaskStatus::Scheduled, 1).is_ready_to_run());
    }

    #[test]
    fn test_future_scheduled_task_is_not_ready() {
        let mut task = test_task(TransferTaskStatus::Scheduled, 1);
        task.scheduled_at = Utc::now() + chrono::Duration::seconds(120);
        assert!(!task.is_ready_to_run());
    }

    #[test]
    fn test_running_task_is_not_ready() {
        assert!(!test_task(TransferTaskStatus::Running, 0).is_ready_to_run());
    }

    #[test]
    fn test_can_retry_under_budget() {
        assert!(test_task(TransferTaskStatus::Failed, 2).can_retry());
    }

    #[test]
    fn test_cannot_retry_at_budget() {
        assert!(!test_task(TransferTaskStatus::Failed, 3).can_retry());
    }

    #[test]
    fn test_cannot_retry_over_budget() {
        assert!(!test_task(TransferTaskStatus::Failed, 5).can_retry());
    }
}
