//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the vidvault REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the vidvault REST API
///
/// The document is served at:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "vidvault REST API",
        version = "0.1.0",
        description = "REST API for downloading online video and audio through yt-dlp, tracking job progress and fetching the finished files",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Video jobs
        crate::api::routes::video_info,
        crate::api::routes::start_download,
        crate::api::routes::download_status,
        crate::api::routes::list_downloads,
        crate::api::routes::cancel_download,
        crate::api::routes::download_file,

        // System
        crate::api::routes::root,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::DownloadType,
        crate::types::DownloadOptions,
        crate::types::Job,
        crate::types::VideoInfo,
        crate::types::FormatSummary,
        crate::types::Event,

        // API request/response types from routes
        crate::api::routes::InfoRequest,
        crate::api::routes::DownloadRequest,
        crate::api::routes::DownloadStartedResponse,
        crate::api::routes::CancelResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "video", description = "Video jobs - Look up metadata, start, monitor and cancel downloads, fetch files"),
        (name = "system", description = "System endpoints - Banner, health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
