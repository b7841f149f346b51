//! Service, repository, and worker initialization

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::{Arc, Weak};

use conveyor_core::{Config, UploadValidator};
use conveyor_db::{FileRepository, TaskRepository};
use conveyor_storage::ObjectStore;
use conveyor_worker::{
    RetryBackoff, TransferContext, TransferQueue, TransferQueueConfig, MAX_RETRY_BACKOFF_SECS,
};

use crate::services::UploadAdmissionService;
use crate::staging::StagingArea;
use crate::state::{AppState, DbState, StorageState};

/// Build repositories, services, and shared state, then start the transfer
/// queue against that state.
///
/// The queue holds the state weakly (no reference cycle); the returned
/// queue handle owns the worker pool's lifetime and must be kept alive for
/// as long as transfers should run.
pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    store: Arc<dyn ObjectStore>,
) -> Result<(Arc<AppState>, TransferQueue)> {
    let files = FileRepository::new(pool.clone());
    let tasks = TaskRepository::new(pool.clone());

    let staging = StagingArea::new(&config.staging_dir)
        .await
        .context("Failed to initialize staging area")?;

    let validator = UploadValidator::new(
        config.max_file_size_bytes,
        config.allowed_extensions.clone(),
    );

    let admission = UploadAdmissionService::new(
        files.clone(),
        tasks.clone(),
        staging.clone(),
        validator,
        config.transfer_max_retries,
    );

    let state = Arc::new(AppState {
        db: DbState {
            pool: pool.clone(),
            files,
            tasks: tasks.clone(),
        },
        storage: StorageState { store, staging },
        admission,
        config: config.clone(),
        is_production: config.is_production(),
    });

    let weak_state: Weak<AppState> = Arc::downgrade(&state);
    let context: Weak<dyn TransferContext> = weak_state;
    let queue_config = TransferQueueConfig {
        max_workers: config.transfer_max_workers,
        poll_interval_ms: config.transfer_poll_interval_ms,
        task_timeout_secs: config.transfer_task_timeout_secs,
        backoff: RetryBackoff::new(config.transfer_retry_base_secs, MAX_RETRY_BACKOFF_SECS),
        ..TransferQueueConfig::default()
    };
    let transfer_queue = TransferQueue::new(tasks, queue_config, context, Some(pool));

    tracing::info!(
        max_workers = config.transfer_max_workers,
        max_retries = config.transfer_max_retries,
        "Transfer queue started"
    );

    Ok((state, transfer_queue))
}
