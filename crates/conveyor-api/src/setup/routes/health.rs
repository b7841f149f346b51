//! Health and readiness probes.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use std::time::Duration;

use conveyor_core::constants::SERVICE_NAME;

use crate::state::AppState;

const DB_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness probe. The process answering is the whole check; no
/// dependencies are touched.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": SERVICE_NAME
        })),
    )
}

/// Readiness probe. The service is ready once the database answers a
/// trivial query within the probe timeout.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let probe = sqlx::query("SELECT 1").execute(&state.db.pool);
    let database = match tokio::time::timeout(DB_PROBE_TIMEOUT, probe).await {
        Ok(Ok(_)) => "ready".to_string(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database readiness probe failed");
            format!("not_ready: {}", e)
        }
        Err(_) => {
            tracing::error!("Database readiness probe timed out");
            "timeout".to_string()
        }
    };

    let ready = database == "ready";
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "database": database
        })),
    )
}
