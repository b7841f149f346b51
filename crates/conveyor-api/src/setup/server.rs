//! HTTP server lifecycle.

use anyhow::{Context, Result};
use axum::Router;

use conveyor_core::Config;

/// Bind the listener and serve until a shutdown signal arrives.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        max_file_mb = config.max_file_size_bytes / 1024 / 1024,
        allowed_extensions = %config.allowed_extensions.join(","),
        staging_dir = %config.staging_dir,
        storage_backend = %config.storage_backend,
        "Listening for upload traffic"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on SIGINT (ctrl-c) or, on Unix, SIGTERM.
///
/// # Panics
/// Panics if the process cannot install its signal handlers; without them
/// the server could never stop cleanly.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.expect("Failed to install SIGINT handler");
                tracing::info!("Received SIGINT, draining connections");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, draining connections");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
        tracing::info!("Received SIGINT, draining connections");
    }
}
