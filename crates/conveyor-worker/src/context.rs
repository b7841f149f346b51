//! Transfer dispatch context trait
//!
//! The API implements this trait for its application state. The worker calls
//! `run_transfer` when processing a claimed task; the implementation loads
//! the file record, drives it through the upload state machine, and reports
//! the attempt outcome.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use conveyor_core::models::TransferTask;

/// Context for transfer dispatch.
///
/// Implemented by the API's application state. The worker holds a weak
/// reference and calls `run_transfer` for each claimed task. Errors should
/// be `TaskError` wrapped in `anyhow` so the queue can tell recoverable
/// failures from terminal ones; a bare error is treated as recoverable.
#[async_trait]
pub trait TransferContext: Send + Sync {
    /// Execute one transfer attempt for a claimed task.
    async fn run_transfer(self: Arc<Self>, task: &TransferTask) -> Result<()>;
}
