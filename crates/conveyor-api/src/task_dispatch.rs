//! Bridges the transfer queue to its task handler.
//!
//! The queue holds application state weakly; if the state has been torn
//! down the queue stops dispatching on its own.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use conveyor_core::models::TransferTask;
use conveyor_worker::TransferContext;

use crate::state::AppState;
use crate::task_handlers::{TaskHandler, TransferTaskHandler};

#[async_trait]
impl TransferContext for AppState {
    async fn run_transfer(self: Arc<Self>, task: &TransferTask) -> Result<()> {
        TransferTaskHandler.process(task, self).await
    }
}
