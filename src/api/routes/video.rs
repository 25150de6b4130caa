//! Video job handlers.

use super::{CancelResponse, DownloadRequest, DownloadStartedResponse, InfoRequest};
use crate::api::AppState;
use crate::error::{Error, JobError};
use crate::types::JobId;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// Parse a path id; anything that is not a job id is reported as not found
fn parse_job_id(raw: &str) -> Result<JobId, Error> {
    raw.parse::<JobId>()
        .map_err(|_| JobError::not_found(raw).into())
}

/// POST /api/video/info - Look up media metadata
#[utoipa::path(
    post,
    path = "/api/video/info",
    tag = "video",
    request_body = InfoRequest,
    responses(
        (status = 200, description = "Media metadata with up to ten formats", body = crate::types::VideoInfo),
        (status = 400, description = "Invalid URL or metadata unobtainable", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn video_info(
    State(state): State<AppState>,
    Json(request): Json<InfoRequest>,
) -> Response {
    match state.downloader.video_info(&request.url).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "Metadata lookup failed");
            e.into_response()
        }
    }
}

/// POST /api/video/download - Start a download job
#[utoipa::path(
    post,
    path = "/api/video/download",
    tag = "video",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Job accepted and running in the background", body = DownloadStartedResponse),
        (status = 500, description = "Job could not be launched", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Response {
    let (url, options) = request.into_parts();

    match state.downloader.submit(url, options).await {
        Ok(id) => (
            StatusCode::OK,
            Json(DownloadStartedResponse {
                download_id: id,
                status: "started".to_string(),
                message: "Download started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start download");
            e.into_response()
        }
    }
}

/// GET /api/video/status/:id - Get one job
#[utoipa::path(
    get,
    path = "/api/video/status/{id}",
    tag = "video",
    params(
        ("id" = String, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "Job record", body = crate::types::Job),
        (status = 404, description = "Download not found", body = crate::error::ApiError)
    )
)]
pub async fn download_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_job_id(&id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.downloader.status(id).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/video/downloads - List all jobs
#[utoipa::path(
    get,
    path = "/api/video/downloads",
    tag = "video",
    responses(
        (status = 200, description = "Every job in submission order", body = Vec<crate::types::Job>)
    )
)]
pub async fn list_downloads(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.list_all().await))
}

/// POST /api/video/cancel/:id - Cancel a job
#[utoipa::path(
    post,
    path = "/api/video/cancel/{id}",
    tag = "video",
    params(
        ("id" = String, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "Job cancelled", body = CancelResponse),
        (status = 404, description = "Download not found", body = crate::error::ApiError),
        (status = 409, description = "Download already finished or failed", body = crate::error::ApiError)
    )
)]
pub async fn cancel_download(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_job_id(&id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.downloader.cancel(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(CancelResponse {
                status: "cancelled".to_string(),
                message: format!("Download {} cancelled", id),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/video/download/:id - Stream a finished job's file
#[utoipa::path(
    get,
    path = "/api/video/download/{id}",
    tag = "video",
    params(
        ("id" = String, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Download not finished", body = crate::error::ApiError),
        (status = 404, description = "Download or file not found", body = crate::error::ApiError)
    )
)]
pub async fn download_file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_job_id(&id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let path = match state.downloader.artifact_path(id).await {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Error::from(JobError::ArtifactMissing { id, path }).into_response();
        }
        Err(e) => {
            tracing::error!(job_id = %id, path = %path.display(), error = %e, "Failed to open artifact");
            return Error::Io(e).into_response();
        }
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string());
    let length = file.metadata().await.ok().map(|m| m.len());

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, content_disposition(&file_name));
    if let Some(length) = length {
        response = response.header(header::CONTENT_LENGTH, length);
    }

    match response.body(Body::from_stream(ReaderStream::new(file))) {
        Ok(response) => response,
        Err(e) => Error::ApiServerError(e.to_string()).into_response(),
    }
}

/// `attachment` disposition with an ASCII fallback name and the exact UTF-8 name
pub(crate) fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}
