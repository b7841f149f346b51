//! Object store setup and initialization

use anyhow::{Context, Result};
use std::sync::Arc;

use conveyor_core::Config;
use conveyor_storage::{create_object_store, ObjectStore};

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    tracing::info!("Initializing object store...");
    let store = create_object_store(config)
        .await
        .context("Failed to initialize object store")?;
    tracing::info!(
        backend = %store.backend_type(),
        "Object store initialized successfully"
    );
    Ok(store)
}
