//! Core downloader implementation split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by domain:
//! - [`control`] - Job submission, queries and cancellation
//! - [`runner`] - Background execution of one job
//! - [`progress`] - Translation of fetcher progress into job updates
//! - [`artifact`] - Resolution of the finished output file
//! - [`info`] - Metadata lookup for the info endpoint
//! - [`lifecycle`] - Shutdown coordination

mod artifact;
mod control;
mod info;
mod lifecycle;
mod progress;
mod runner;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{Fetcher, UnavailableFetcher, YtDlpFetcher};
use crate::registry::{InMemoryJobRegistry, JobRegistry};
use crate::types::{Event, JobId};

/// Concurrency and cancellation state shared by all runner tasks
#[derive(Clone)]
pub(crate) struct JobControl {
    /// Semaphore to limit concurrently running jobs (respects max_concurrent_jobs config)
    pub(crate) concurrent_limit: std::sync::Arc<tokio::sync::Semaphore>,
    /// Map of running jobs to their cancellation tokens; a runner removes its entry when it exits
    pub(crate) active_jobs: std::sync::Arc<
        tokio::sync::Mutex<std::collections::HashMap<JobId, tokio_util::sync::CancellationToken>>,
    >,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl JobControl {
    fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            concurrent_limit: std::sync::Arc::new(tokio::sync::Semaphore::new(
                max_concurrent_jobs,
            )),
            active_jobs: std::sync::Arc::new(tokio::sync::Mutex::new(
                std::collections::HashMap::new(),
            )),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
        }
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Downloader {
    /// Job records, the only shared mutable job state
    pub(crate) registry: std::sync::Arc<dyn JobRegistry>,
    /// Media fetcher shared by every job (trait object for pluggable implementations)
    pub(crate) fetcher: std::sync::Arc<dyn Fetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Concurrency limit, cancellation tokens and the shutdown flag
    pub(crate) job_control: JobControl,
}

impl Downloader {
    /// Create a new Downloader instance
    ///
    /// This validates the configuration, creates the download directory,
    /// picks a fetcher (an explicit `ytdlp_path`, then a PATH search, then
    /// [`UnavailableFetcher`]) and starts with an empty in-memory registry.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let fetcher: std::sync::Arc<dyn Fetcher> =
            match YtDlpFetcher::from_config(&config.fetcher) {
                Some(fetcher) => std::sync::Arc::new(fetcher),
                None => std::sync::Arc::new(UnavailableFetcher),
            };

        tracing::info!(
            fetcher = fetcher.name(),
            download_dir = %config.download.download_dir.display(),
            max_concurrent_jobs = config.download.max_concurrent_jobs,
            "Fetcher initialized"
        );

        Ok(Self::with_components(
            config,
            std::sync::Arc::new(InMemoryJobRegistry::new()),
            fetcher,
        ))
    }

    /// Assemble a downloader from explicit parts
    ///
    /// Nothing is created on disk; the caller is responsible for the
    /// download directory existing.
    pub fn with_components(
        config: Config,
        registry: std::sync::Arc<dyn JobRegistry>,
        fetcher: std::sync::Arc<dyn Fetcher>,
    ) -> Self {
        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);
        let job_control = JobControl::new(config.download.max_concurrent_jobs.max(1));

        Self {
            registry,
            fetcher,
            event_tx,
            config: std::sync::Arc::new(config),
            job_control,
        }
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vidvault::{Config, Downloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = Downloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "job event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Name of the fetcher in use ("yt-dlp" or "unavailable")
    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default:
    /// 127.0.0.1:8000) and runs until the process exits.
    pub fn spawn_api_server(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
