//! Handlers for queued transfer tasks.

mod transfer;

pub use transfer::TransferTaskHandler;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use conveyor_core::models::TransferTask;

use crate::state::AppState;

/// A handler for one kind of queued task.
///
/// Errors should be `TaskError` wrapped in `anyhow` so the queue can
/// distinguish recoverable failures from terminal ones.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn process(&self, task: &TransferTask, state: Arc<AppState>) -> Result<()>;
}
