//! Route table and HTTP middleware stack.

mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use conveyor_core::Config;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// Headroom on top of the file size ceiling for multipart boundaries and
/// the other form fields.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Builds the full router: API routes, docs, and the middleware stack.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    // DefaultBodyLimit is disabled in favor of RequestBodyLimitLayer; a
    // single ceiling covers the whole multipart body.
    let body_ceiling = config.max_file_size_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/upload", post(handlers::upload::upload_file))
        .route("/files", get(handlers::files::list_files))
        .route(
            "/files/{id}",
            get(handlers::files::get_file).delete(handlers::files::delete_file),
        )
        .route("/files/{id}/download", get(handlers::files::download_file))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(config.http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_ceiling))
        .layer(DefaultBodyLimit::disable())
        .layer(build_cors(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    // Config::from_env already rejects the wildcard in production, so this
    // branch is a development convenience.
    if config.cors_allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!(
            "CORS allows every origin; restrict CORS_ALLOWED_ORIGINS outside local development"
        );
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any)
}
