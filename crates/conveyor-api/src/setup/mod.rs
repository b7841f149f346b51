//! Application wiring: configuration, telemetry, database, storage,
//! services, and the router.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;

use conveyor_core::Config;
use conveyor_worker::TransferQueue;

use crate::state::AppState;

/// Brings the whole application up, in dependency order.
///
/// The returned [`TransferQueue`] handle owns the background worker pool;
/// dropping it stops transfer processing, so the caller keeps it for the
/// life of the process and shuts it down after the server exits.
pub async fn initialize_app(
    config: Config,
) -> Result<(Arc<AppState>, axum::Router, TransferQueue)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry();
    tracing::info!("Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;
    let store = storage::setup_storage(&config).await?;
    let (state, transfer_queue) = services::initialize_services(&config, pool, store).await?;
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router, transfer_queue))
}
