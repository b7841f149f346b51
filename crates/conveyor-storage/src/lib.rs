//! Conveyor Storage Library
//!
//! Object store backends that files are mirrored to after admission.
//! Destination names are flat, generated filenames (`{uuid}.{ext}`), so
//! re-uploading the same name overwrites in place and task redelivery
//! stays idempotent.

pub mod factory;
pub mod local;
pub mod s3;
pub mod traits;

pub use conveyor_core::StorageBackend;
pub use factory::create_object_store;
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;
pub use traits::{ObjectStore, StorageError, StorageResult, StoredObject};
