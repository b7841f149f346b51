//! Conveyor Worker: durable transfer queue and worker pool.
//!
//! This crate provides the transfer queue (claiming, retry with backoff,
//! stale-task reaping, worker pool) and the `TransferContext` trait. The API
//! implements the trait for its application state; the actual upload state
//! machine lives in the API's task handler.

mod backoff;
mod context;
mod queue;

pub use backoff::{RetryBackoff, MAX_RETRY_BACKOFF_SECS};
pub use context::TransferContext;
pub use queue::{TransferQueue, TransferQueueConfig, TASK_NOTIFY_CHANNEL};
