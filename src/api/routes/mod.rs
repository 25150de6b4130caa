//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`video`] - Metadata lookup, job submission, status, cancellation and artifact download
//! - [`system`] - Root, health, OpenAPI, events

use crate::types::{DownloadOptions, DownloadType, JobId};
use serde::{Deserialize, Serialize};

mod system;
mod video;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use video::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /api/video/info
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct InfoRequest {
    /// Media page URL
    pub url: String,
}

/// Request body for POST /api/video/download
///
/// `download_type`, `format` and `quality` may be omitted or `null`; either
/// falls back to the default.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Media page URL (not validated; a bad URL ends the job in `error`)
    pub url: String,
    /// What to fetch (default: video)
    #[serde(default)]
    pub download_type: Option<DownloadType>,
    /// Container hint such as "mp4", a yt-dlp selector, or "best" (default)
    #[serde(default)]
    pub format: Option<String>,
    /// Quality cap such as "720p", "best" (default) for none
    #[serde(default)]
    pub quality: Option<String>,
    /// Clip start in seconds
    #[serde(default)]
    pub start_time: Option<u64>,
    /// Clip end in seconds
    #[serde(default)]
    pub end_time: Option<u64>,
}

impl DownloadRequest {
    /// Split into the URL and the options handed to the downloader
    pub fn into_parts(self) -> (String, DownloadOptions) {
        let options = DownloadOptions {
            download_type: self.download_type.unwrap_or_default(),
            format: or_best(self.format),
            quality: or_best(self.quality),
            start_time: self.start_time,
            end_time: self.end_time,
        };
        (self.url, options)
    }
}

fn or_best(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "best".to_string())
}

/// Response body for POST /api/video/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadStartedResponse {
    /// Identifier for polling, cancelling and fetching the artifact
    pub download_id: JobId,
    /// Always "started"
    pub status: String,
    /// Human-readable message
    pub message: String,
}

/// Response body for POST /api/video/cancel/{id}
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    /// Always "cancelled"
    pub status: String,
    /// Human-readable message
    pub message: String,
}
