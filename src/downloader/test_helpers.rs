//! Shared test helpers for creating Downloader instances in tests.

use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::fetcher::{FetchOutcome, FetchRequest, Fetcher, MediaFormat, MediaInfo, ProgressEvent, ProgressSink};
use crate::registry::InMemoryJobRegistry;
use crate::types::{DownloadType, Job, JobId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

/// Uploader reported by [`ScriptedFetcher`]
pub(crate) const TEST_UPLOADER: &str = "tester";

/// Release switch for a [`ScriptedFetcher`] download
#[derive(Clone, Default)]
pub(crate) struct Gate(Arc<AtomicBool>);

impl Gate {
    pub(crate) fn open(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-process fetcher that replays scripted progress and writes a small file
///
/// URLs that are not http(s) fail at metadata extraction, like a real
/// extractor rejecting `not-a-url`.
pub(crate) struct ScriptedFetcher {
    pub(crate) title: Option<String>,
    pub(crate) events: Vec<ProgressEvent>,
    pub(crate) gate: Option<Gate>,
    pub(crate) fail_download: Option<String>,
    pub(crate) report_path: bool,
    pub(crate) ignore_cancel: bool,
    pub(crate) downloads_started: AtomicUsize,
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self {
            title: Some("Test Clip".to_string()),
            events: vec![
                ProgressEvent::Downloading {
                    downloaded_bytes: 512,
                    total_bytes: Some(2048),
                    speed: Some(1024.0),
                    eta: Some(2),
                },
                ProgressEvent::Downloading {
                    downloaded_bytes: 2048,
                    total_bytes: Some(2048),
                    speed: Some(1024.0),
                    eta: Some(0),
                },
                ProgressEvent::StreamFinished,
            ],
            gate: None,
            fail_download: None,
            report_path: true,
            ignore_cancel: false,
            downloads_started: AtomicUsize::new(0),
        }
    }
}

impl ScriptedFetcher {
    /// A fetcher whose downloads block until the returned gate opens
    pub(crate) fn gated() -> (Self, Gate) {
        let gate = Gate::default();
        (
            Self {
                gate: Some(gate.clone()),
                ..Default::default()
            },
            gate,
        )
    }

    fn wait_for_gate(&self, cancel: &CancellationToken) -> Result<()> {
        let Some(gate) = &self.gate else {
            return Ok(());
        };
        while !gate.is_open() {
            if cancel.is_cancelled() && !self.ignore_cancel {
                return Err(Error::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

impl Fetcher for ScriptedFetcher {
    fn extract_info(&self, url: &str) -> Result<MediaInfo> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Extraction(format!(
                "[generic] '{}' is not a valid URL",
                url
            )));
        }
        Ok(MediaInfo {
            title: self.title.clone(),
            uploader: Some(TEST_UPLOADER.to_string()),
            duration: Some(42.0),
            formats: vec![MediaFormat {
                format_id: Some("18".into()),
                ext: Some("mp4".into()),
                resolution: Some("640x360".into()),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    fn download(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        self.downloads_started.fetch_add(1, Ordering::SeqCst);

        for event in &self.events {
            progress.report(event.clone());
        }

        self.wait_for_gate(cancel)?;

        if let Some(message) = &self.fail_download {
            return Err(Error::Download(message.clone()));
        }

        let ext = match request.options.download_type {
            DownloadType::Audio => request.audio_codec.as_str(),
            DownloadType::Video | DownloadType::Full => "mp4",
        };
        let title = self.title.as_deref().unwrap_or("NA");
        let path = request
            .output_dir
            .join(format!("{}_{}.{}", title, TEST_UPLOADER, ext));
        std::fs::write(&path, b"scripted media bytes")?;

        Ok(FetchOutcome {
            output_path: self.report_path.then_some(path),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Helper to create a test Downloader around `fetcher`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader_with(
    fetcher: Arc<dyn Fetcher>,
    max_concurrent_jobs: usize,
) -> (Downloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.max_concurrent_jobs = max_concurrent_jobs;
    config.download.shutdown_timeout = Duration::from_secs(5);
    std::fs::create_dir_all(&config.download.download_dir).unwrap();

    let downloader =
        Downloader::with_components(config, Arc::new(InMemoryJobRegistry::new()), fetcher);

    (downloader, temp_dir)
}

/// Helper to create a test Downloader with the default scripted fetcher
pub(crate) fn create_test_downloader() -> (Downloader, tempfile::TempDir) {
    create_test_downloader_with(Arc::new(ScriptedFetcher::default()), 3)
}

/// Poll until the job satisfies `done`, panicking after five seconds
pub(crate) async fn wait_for_job(
    downloader: &Downloader,
    id: JobId,
    done: impl Fn(&Job) -> bool,
) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job = downloader.status(id).await.unwrap();
        if done(&job) {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for job {id}; last state: {job:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the job reaches a terminal status
pub(crate) async fn wait_for_terminal(downloader: &Downloader, id: JobId) -> Job {
    wait_for_job(downloader, id, |job| job.status.is_terminal()).await
}
