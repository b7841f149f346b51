//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use conveyor_core::Config;
use conveyor_db::{FileRepository, TaskRepository};
use conveyor_storage::ObjectStore;

use crate::services::UploadAdmissionService;
use crate::staging::StagingArea;

/// Database pool and repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub files: FileRepository,
    pub tasks: TaskRepository,
}

/// Object store and the local staging area in front of it.
#[derive(Clone)]
pub struct StorageState {
    pub store: Arc<dyn ObjectStore>,
    pub staging: StagingArea,
}

/// Shared application state, held behind an `Arc` by the router and the
/// transfer worker (the worker holds it weakly).
pub struct AppState {
    pub db: DbState,
    pub storage: StorageState,
    pub admission: UploadAdmissionService,
    pub config: Config,
    pub is_production: bool,
}
