//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use conveyor_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Conveyor API",
        version = "0.1.0",
        description = "File upload service with content-hash deduplication and asynchronous mirroring to object storage. Uploads are admitted synchronously (validated, hashed, staged, recorded) and transferred to the remote store in the background; records expose their transfer status and, once completed, a public download URL."
    ),
    paths(
        handlers::upload::upload_file,
        handlers::files::get_file,
        handlers::files::list_files,
        handlers::files::delete_file,
        handlers::files::download_file,
    ),
    components(
        schemas(
            handlers::upload::FileUploadResponse,
            handlers::files::FileInfo,
            handlers::files::FileListResponse,
            handlers::files::DeleteResponse,
            handlers::files::DownloadUrlResponse,
            models::UploadStatus,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "files", description = "File upload, metadata, and download operations")
    )
)]
pub struct ApiDoc;
