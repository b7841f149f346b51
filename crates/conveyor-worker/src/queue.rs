//! Durable transfer queue built on the `transfer_tasks` table.
//!
//! A fixed pool of workers claims due tasks with `FOR UPDATE SKIP LOCKED`,
//! woken either by PostgreSQL NOTIFY or by a polling tick. Failed attempts
//! are rescheduled with exponential backoff until the attempt budget runs
//! out. [`TransferQueue::shutdown`] only stops new claims; in-flight
//! transfers keep running until they finish or hit the task timeout.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

use conveyor_core::models::TransferTask;
use conveyor_core::TaskError;
use conveyor_db::TaskRepository;

use crate::backoff::RetryBackoff;
use crate::context::TransferContext;

/// PostgreSQL NOTIFY channel announcing newly enqueued transfer tasks.
pub const TASK_NOTIFY_CHANNEL: &str = "conveyor_new_task";

/// Delay before the notify listener reconnects after a connection error.
const LISTENER_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TransferQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    /// Per-attempt execution timeout in seconds.
    pub task_timeout_secs: u64,
    /// Backoff schedule applied between failed attempts.
    pub backoff: RetryBackoff,
    /// Interval in seconds between runs of the stale task reaper.
    pub stale_task_reap_interval_secs: u64,
    /// Grace period in seconds on top of the task timeout before a running
    /// task counts as abandoned.
    pub stale_task_grace_period_secs: i64,
}

impl Default for TransferQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1000,
            task_timeout_secs: 600,
            backoff: RetryBackoff::default(),
            stale_task_reap_interval_secs: 60,
            stale_task_grace_period_secs: 300,
        }
    }
}

/// Handle to the background worker pool.
///
/// Dropping the handle closes the shutdown channel and stops the pool, so
/// the owner keeps it alive for the life of the process.
pub struct TransferQueue {
    shutdown_tx: mpsc::Sender<()>,
}

impl TransferQueue {
    /// Start the worker pool and return its handle.
    ///
    /// The dispatch context is held weakly so the queue never keeps the
    /// application state alive by itself. With a `pool` the workers wake on
    /// NOTIFY the moment a task lands; without one they rely on the poll
    /// tick alone.
    pub fn new(
        repository: TaskRepository,
        config: TransferQueueConfig,
        context: Weak<dyn TransferContext>,
        pool: Option<sqlx::PgPool>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(run_pool(repository, config, context, shutdown_rx, pool));
        Self { shutdown_tx }
    }

    /// Stop claiming new tasks.
    ///
    /// Returns as soon as the signal is sent. Attempts already spawned keep
    /// running until they finish or time out.
    pub async fn shutdown(&self) {
        tracing::info!("Transfer queue shutdown requested");
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn run_pool(
    repository: TaskRepository,
    config: TransferQueueConfig,
    context: Weak<dyn TransferContext>,
    mut shutdown_rx: mpsc::Receiver<()>,
    pool: Option<sqlx::PgPool>,
) {
    tracing::info!(
        max_workers = config.max_workers,
        poll_interval_ms = config.poll_interval_ms,
        listen_notify = pool.is_some(),
        "Transfer worker pool running"
    );

    let semaphore = Arc::new(Semaphore::new(config.max_workers));
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    // The kept sender stops recv() from yielding None while no listener
    // task holds a clone (NOTIFY disabled or the listener reconnecting).
    let (_notify_guard, mut notify_rx) = notify_channel(pool);
    let reaper_stop = spawn_stale_reaper(&repository, &config);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("Transfer worker pool stopping");
                if let Some(ref tx) = reaper_stop {
                    let _ = tx.send(()).await;
                }
                break;
            }
            _ = notify_rx.recv() => dispatch_next(&repository, &config, &semaphore, &context).await,
            _ = sleep(poll_interval) => dispatch_next(&repository, &config, &semaphore, &context).await,
        }
    }

    tracing::info!("Transfer worker pool stopped");
}

/// Opens the wakeup channel and, when a pool is supplied, spawns the
/// LISTEN task feeding it.
fn notify_channel(pool: Option<sqlx::PgPool>) -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(16);
    if let Some(pool) = pool {
        tokio::spawn(listen_for_tasks(pool, tx.clone()));
    }
    (tx, rx)
}

async fn listen_for_tasks(pool: sqlx::PgPool, tx: mpsc::Sender<()>) {
    loop {
        let mut listener = match sqlx::postgres::PgListener::connect_with(&pool).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::warn!(error = %e, "Notify connection failed, retrying");
                sleep(LISTENER_RECONNECT_DELAY).await;
                continue;
            }
        };
        if let Err(e) = listener.listen(TASK_NOTIFY_CHANNEL).await {
            tracing::warn!(error = %e, channel = TASK_NOTIFY_CHANNEL, "LISTEN failed, retrying");
            sleep(LISTENER_RECONNECT_DELAY).await;
            continue;
        }
        while listener.recv().await.is_ok() {
            let _ = tx.send(()).await;
        }
        tracing::warn!("Notify connection lost, reconnecting");
        sleep(LISTENER_RECONNECT_DELAY).await;
    }
}

/// Spawns the reaper that returns abandoned running tasks to the queue.
/// Disabled when the interval is zero.
fn spawn_stale_reaper(
    repository: &TaskRepository,
    config: &TransferQueueConfig,
) -> Option<mpsc::Sender<()>> {
    if config.stale_task_reap_interval_secs == 0 {
        return None;
    }

    let repository = repository.clone();
    let period = Duration::from_secs(config.stale_task_reap_interval_secs);
    let stale_after_secs = config.task_timeout_secs as i64 + config.stale_task_grace_period_secs;
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = repository.reap_stale(stale_after_secs).await {
                        tracing::error!(error = %e, "Stale transfer reaper failed");
                    }
                }
                _ = stop_rx.recv() => break,
            }
        }
    });

    Some(stop_tx)
}

/// Claims at most one due task and hands it to a worker slot.
async fn dispatch_next(
    repository: &TaskRepository,
    config: &TransferQueueConfig,
    semaphore: &Arc<Semaphore>,
    context: &Weak<dyn TransferContext>,
) {
    let Ok(permit) = semaphore.clone().try_acquire_owned() else {
        tracing::debug!("All transfer workers busy, deferring claim");
        return;
    };

    let task = match repository.claim_next().await {
        Ok(Some(task)) => task,
        Ok(None) => {
            tracing::trace!("Transfer queue empty");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Claiming a transfer task failed");
            return;
        }
    };

    let repository = repository.clone();
    let config = config.clone();
    let context = context.clone();
    tokio::spawn(async move {
        let _permit = permit;
        if let Err(e) = run_attempt(task, repository, config, context).await {
            tracing::error!(error = %e, "Transfer task ended in failure");
        }
    });
}

#[tracing::instrument(skip_all, fields(task.id = %task.id, file.id = %task.file_id))]
async fn run_attempt(
    task: TransferTask,
    repository: TaskRepository,
    config: TransferQueueConfig,
    context: Weak<dyn TransferContext>,
) -> Result<()> {
    let ctx = context
        .upgrade()
        .context("Transfer context dropped before the task could run")?;

    let budget = Duration::from_secs(config.task_timeout_secs);
    let outcome = match tokio::time::timeout(budget, ctx.run_transfer(&task)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(anyhow::anyhow!(
            "Transfer timed out after {} seconds",
            config.task_timeout_secs
        )),
    };

    match outcome {
        Ok(()) => {
            repository
                .mark_completed(task.id)
                .await
                .context("Failed to record task completion")?;
            Ok(())
        }
        Err(e) => handle_failed_attempt(&task, &repository, &config, e).await,
    }
}

/// Terminal errors and exhausted attempt budgets mark the task failed;
/// everything else is rescheduled with backoff.
async fn handle_failed_attempt(
    task: &TransferTask,
    repository: &TaskRepository,
    config: &TransferQueueConfig,
    error: anyhow::Error,
) -> Result<()> {
    let terminal = is_terminal(&error);

    tracing::error!(
        error = %error,
        attempt_count = task.attempt_count,
        max_attempts = task.max_attempts,
        terminal,
        "Transfer attempt failed"
    );

    if !terminal && task.can_retry() {
        let delay_secs = config.backoff.delay_secs(task.attempt_count);
        let next_attempt_at = Utc::now() + chrono::Duration::seconds(delay_secs as i64);
        repository
            .schedule_retry(task.id, next_attempt_at, &error.to_string())
            .await
            .context("Failed to reschedule transfer task")?;
        tracing::info!(delay_secs, "Transfer retry scheduled");
        return Ok(());
    }

    repository
        .mark_failed(task.id, &error.to_string())
        .await
        .context("Failed to record task failure")?;
    Err(error)
}

/// A failure is terminal only when something downstream tagged it as
/// unrecoverable; plain errors default to retryable.
fn is_terminal(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<TaskError>()
        .is_some_and(|te| !te.is_recoverable())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_unrecoverable_is_terminal() {
        let err: anyhow::Error =
            TaskError::unrecoverable(anyhow::anyhow!("staging file missing")).into();
        assert!(is_terminal(&err));
    }

    #[test]
    fn tagged_recoverable_is_not_terminal() {
        let err: anyhow::Error = TaskError::recoverable(anyhow::anyhow!("connection reset")).into();
        assert!(!is_terminal(&err));
    }

    #[test]
    fn plain_errors_default_to_retryable() {
        assert!(!is_terminal(&anyhow::anyhow!("disk hiccup")));
    }
}
