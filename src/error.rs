//! Error types for vidvault
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (job lookups, fetcher failures, validation)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::JobId;

/// Result type alias for vidvault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vidvault
///
/// Errors raised inside a background job never reach an HTTP caller directly.
/// The job runner stores their `Display` text as the job's terminal error
/// message instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Malformed request input (only enforced on the metadata lookup path)
    #[error("validation error: {0}")]
    Validation(String),

    /// Metadata for a URL could not be obtained
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Failure while fetching or transcoding media
    #[error("download error: {0}")]
    Download(String),

    /// Job-related error
    #[error("{0}")]
    Job(#[from] JobError),

    /// The operation was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// External tool execution failed (yt-dlp, ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors tied to a specific download job
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with this id exists
    #[error("download {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: String,
    },

    /// The job finished but its output file is gone or was never recorded
    #[error("downloaded file for {id} not found at {path}")]
    ArtifactMissing {
        /// The job whose artifact is missing
        id: JobId,
        /// The path where the artifact was expected
        path: PathBuf,
    },

    /// The job has not reached `finished` yet
    #[error("download {id} not completed yet, current status: {status}")]
    NotFinished {
        /// The job that is still running (or failed)
        id: JobId,
        /// The job's current status
        status: String,
    },

    /// Cannot perform operation in current state
    #[error("cannot {operation} download {id} in state {current_state}")]
    InvalidState {
        /// The job that is in an invalid state for the operation
        id: JobId,
        /// The operation that was attempted (e.g., "cancel")
        operation: String,
        /// The current state that prevents the operation
        current_state: String,
    },

    /// The identifier generator produced an id that is already registered
    #[error("download id {id} already exists")]
    DuplicateId {
        /// The colliding job ID
        id: JobId,
    },
}

impl JobError {
    /// Shorthand for a not-found error keyed by any displayable id
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        JobError::NotFound { id: id.to_string() }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "download_not_found",
///     "message": "download 0f9c… not found",
///     "details": {
///       "download_id": "0f9c…"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::Extraction(_) => 400,
            Error::Job(JobError::NotFinished { .. }) => 400,

            // 404 Not Found
            Error::Job(JobError::NotFound { .. }) => 404,
            Error::Job(JobError::ArtifactMissing { .. }) => 404,

            // 409 Conflict
            Error::Job(JobError::InvalidState { .. }) => 409,
            Error::Cancelled => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Job(JobError::DuplicateId { .. }) => 500,
            Error::Download(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 501 Not Implemented - Feature not supported
            Error::NotSupported(_) => 501,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Extraction(_) => "extraction_error",
            Error::Download(_) => "download_error",
            Error::Job(e) => match e {
                JobError::NotFound { .. } => "download_not_found",
                JobError::ArtifactMissing { .. } => "file_not_found",
                JobError::NotFinished { .. } => "download_not_finished",
                JobError::InvalidState { .. } => "invalid_state",
                JobError::DuplicateId { .. } => "duplicate_id",
            },
            Error::Cancelled => "cancelled",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Job(JobError::NotFound { id }) => Some(serde_json::json!({
                "download_id": id,
            })),
            Error::Job(JobError::ArtifactMissing { id, path }) => Some(serde_json::json!({
                "download_id": id,
                "path": path,
            })),
            Error::Job(JobError::NotFinished { id, status }) => Some(serde_json::json!({
                "download_id": id,
                "status": status,
            })),
            Error::Job(JobError::InvalidState {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "download_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        let mut api = ApiError::new(code, message);
        api.error.details = details;
        api
    }
}
