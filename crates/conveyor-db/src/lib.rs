//! Conveyor Database Layer
//!
//! Repositories for file metadata and the durable transfer task queue.
//! All access goes through `sqlx` against PostgreSQL; schema lives in
//! the workspace-level `migrations/` directory.

pub mod files;
pub mod tasks;

pub use files::{FileCreateOutcome, FileRepository};
pub use tasks::TaskRepository;
