//! HTTP surface of the upload service: handlers, the admission pipeline,
//! transfer task handling, and application wiring.

mod api_doc;
pub mod setup;
mod task_dispatch;
mod telemetry;

pub mod error;
pub mod handlers;
pub mod services;
pub mod staging;
pub mod state;
pub mod task_handlers;

pub use conveyor_worker::{TransferQueue, TransferQueueConfig};
pub use error::ErrorResponse;
pub use task_handlers::{TaskHandler, TransferTaskHandler};
