use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use conveyor_core::models::TransferTask;

/// Repository for the durable transfer task queue.
///
/// Tasks are claimed with `FOR UPDATE SKIP LOCKED` so any number of
/// workers can poll the same table without double-delivery. Crash
/// recovery is handled by `reap_stale`, which returns long-running
/// claims to `pending` for redelivery.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a transfer for a freshly admitted file.
    ///
    /// The insert and the wake-up notification commit atomically;
    /// a failed `pg_notify` is non-fatal because workers also poll.
    #[tracing::instrument(skip(self))]
    pub async fn enqueue(
        &self,
        file_id: Uuid,
        staging_path: &str,
        max_attempts: i32,
    ) -> Result<TransferTask> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for task enqueue")?;

        let task: TransferTask = sqlx::query_as::<Postgres, TransferTask>(
            r#"
            INSERT INTO transfer_tasks (file_id, staging_path, max_attempts)
            VALUES ($1, $2, $3)
            RETURNING
                id,
                file_id,
                staging_path,
                status,
                attempt_count,
                max_attempts,
                scheduled_at,
                claimed_at,
                completed_at,
                last_error,
                created_at,
                updated_at
            "#,
        )
        .bind(file_id)
        .bind(staging_path)
        .bind(max_attempts)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                file_id = %file_id,
                "Failed to insert transfer task"
            );
            anyhow::anyhow!("Failed to insert transfer task: {}", e)
        })?;

        // Wake workers immediately instead of waiting for the poll interval
        if let Err(e) = sqlx::query("SELECT pg_notify('conveyor_new_task', $1)")
            .bind(task.id.to_string())
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(
                error = %e,
                task_id = %task.id,
                "Failed to send pg_notify for new task, workers will discover it via polling"
            );
        }

        tx.commit()
            .await
            .context("Failed to commit task enqueue transaction")?;

        tracing::info!(
            task_id = %task.id,
            file_id = %file_id,
            "Transfer task enqueued"
        );

        Ok(task)
    }

    /// Atomically claim the next runnable task and mark it `running`.
    ///
    /// Runnable means `pending`, or `scheduled` with a due `scheduled_at`.
    /// `FOR UPDATE SKIP LOCKED` lets concurrent claimers pass over rows
    /// another worker is already taking.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next(&self) -> Result<Option<TransferTask>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let task: Option<TransferTask> = sqlx::query_as::<Postgres, TransferTask>(
            r#"
            SELECT
                id,
                file_id,
                staging_path,
                status,
                attempt_count,
                max_attempts,
                scheduled_at,
                claimed_at,
                completed_at,
                last_error,
                created_at,
                updated_at
            FROM transfer_tasks
            WHERE status IN ('pending', 'scheduled')
                AND scheduled_at <= NOW()
            ORDER BY scheduled_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch next transfer task")?;

        if let Some(task) = task {
            let claimed: TransferTask = sqlx::query_as::<Postgres, TransferTask>(
                r#"
                UPDATE transfer_tasks
                SET status = 'running',
                    claimed_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING
                    id,
                    file_id,
                    staging_path,
                    status,
                    attempt_count,
                    max_attempts,
                    scheduled_at,
                    claimed_at,
                    completed_at,
                    last_error,
                    created_at,
                    updated_at
                "#,
            )
            .bind(task.id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to mark task running")?;

            tx.commit().await.context("Failed to commit task claim")?;

            tracing::debug!(
                task_id = %claimed.id,
                file_id = %claimed.file_id,
                attempt_count = claimed.attempt_count,
                "Transfer task claimed"
            );

            Ok(Some(claimed))
        } else {
            tx.rollback().await.ok();
            Ok(None)
        }
    }

    /// Push a failed attempt back onto the queue with a later due time.
    #[tracing::instrument(skip(self, error))]
    pub async fn schedule_retry(
        &self,
        task_id: Uuid,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<TransferTask> {
        let task: TransferTask = sqlx::query_as::<Postgres, TransferTask>(
            r#"
            UPDATE transfer_tasks
            SET status = 'scheduled',
                attempt_count = attempt_count + 1,
                scheduled_at = $2,
                last_error = $3,
                claimed_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                file_id,
                staging_path,
                status,
                attempt_count,
                max_attempts,
                scheduled_at,
                claimed_at,
                completed_at,
                last_error,
                created_at,
                updated_at
            "#,
        )
        .bind(task_id)
        .bind(next_attempt_at)
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .context("Failed to schedule task retry")?;

        tracing::info!(
            task_id = %task_id,
            attempt_count = task.attempt_count,
            max_attempts = task.max_attempts,
            next_attempt_at = %next_attempt_at,
            "Transfer task retry scheduled"
        );

        Ok(task)
    }

    /// Mark a task `completed`.
    #[tracing::instrument(skip(self))]
    pub async fn mark_completed(&self, task_id: Uuid) -> Result<TransferTask> {
        let task: TransferTask = sqlx::query_as::<Postgres, TransferTask>(
            r#"
            UPDATE transfer_tasks
            SET status = 'completed',
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                file_id,
                staging_path,
                status,
                attempt_count,
                max_attempts,
                scheduled_at,
                claimed_at,
                completed_at,
                last_error,
                created_at,
                updated_at
            "#,
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark task completed")?;

        tracing::info!(
            task_id = %task_id,
            file_id = %task.file_id,
            "Transfer task completed"
        );

        Ok(task)
    }

    /// Mark a task terminally `failed`.
    #[tracing::instrument(skip(self, error))]
    pub async fn mark_failed(&self, task_id: Uuid, error: &str) -> Result<TransferTask> {
        let task: TransferTask = sqlx::query_as::<Postgres, TransferTask>(
            r#"
            UPDATE transfer_tasks
            SET status = 'failed',
                last_error = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                file_id,
                staging_path,
                status,
                attempt_count,
                max_attempts,
                scheduled_at,
                claimed_at,
                completed_at,
                last_error,
                created_at,
                updated_at
            "#,
        )
        .bind(task_id)
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark task failed")?;

        tracing::error!(
            task_id = %task_id,
            file_id = %task.file_id,
            attempt_count = task.attempt_count,
            "Transfer task failed"
        );

        Ok(task)
    }

    /// Return tasks stuck in `running` to `pending` for redelivery.
    ///
    /// A claim older than `stale_after_secs` means the worker died
    /// mid-transfer. Redelivery does not consume retry budget; the
    /// attempt never reported a result. Returns the number of rows reset.
    #[tracing::instrument(skip(self))]
    pub async fn reap_stale(&self, stale_after_secs: i64) -> Result<u64> {
        let count = sqlx::query(
            r#"
            UPDATE transfer_tasks
            SET status = 'pending',
                claimed_at = NULL,
                updated_at = NOW()
            WHERE status = 'running'
                AND claimed_at < NOW() - ($1 * interval '1 second')
            "#,
        )
        .bind(stale_after_secs)
        .execute(&self.pool)
        .await
        .context("Failed to reap stale tasks")?
        .rows_affected();

        if count > 0 {
            tracing::warn!(
                count = count,
                stale_after_secs = stale_after_secs,
                "Reset stale running tasks for redelivery"
            );
        }

        Ok(count)
    }
}
