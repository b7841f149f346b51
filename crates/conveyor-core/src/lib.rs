//! Domain models, error types, configuration, and validation shared by
//! every conveyor crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod models;
pub mod storage_types;
pub mod task_error;
pub mod validation;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hash::sha256_hex;
pub use storage_types::StorageBackend;
pub use task_error::{TaskError, TaskResultExt};
pub use validation::{UploadValidator, ValidationError};
