//! # vidvault
//!
//! HTTP media download service: submit a URL, poll the job, fetch the file.
//!
//! ## Design Philosophy
//!
//! vidvault is designed to be:
//! - **Non-blocking** - Submission returns an id at once; work runs in the background
//! - **Pollable** - Every job keeps a queryable record of status and byte-level progress
//! - **Pluggable** - Media fetching sits behind the [`fetcher::Fetcher`] trait (yt-dlp by default)
//! - **Event-driven** - Consumers may subscribe to job events instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidvault::{Config, DownloadOptions, DownloadType, Downloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = Downloader::new(Config::default()).await?;
//!
//!     let options = DownloadOptions {
//!         download_type: DownloadType::Audio,
//!         ..Default::default()
//!     };
//!     let id = downloader
//!         .submit("https://www.youtube.com/watch?v=dQw4w9WgXcQ", options)
//!         .await?;
//!
//!     let mut events = downloader.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     println!("final state: {:?}", downloader.status(id).await?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Media fetchers (yt-dlp and the unavailable fallback)
pub mod fetcher;
/// Job registry
pub mod registry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use downloader::Downloader;
pub use error::{ApiError, Error, ErrorDetail, JobError, Result, ToHttpStatus};
pub use fetcher::{Fetcher, UnavailableFetcher, YtDlpFetcher};
pub use registry::{InMemoryJobRegistry, JobRegistry};
pub use types::{
    DownloadOptions, DownloadType, Event, FormatSummary, Job, JobId, JobStatus, VideoInfo,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vidvault::{Config, Downloader, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Arc::new(Downloader::new(Config::default()).await?);
///     let _server = downloader.spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: std::sync::Arc<Downloader>) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
