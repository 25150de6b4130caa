//! Traits and types for media fetching

use crate::types::DownloadOptions;
use serde::Deserialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Metadata reported by a fetcher for one URL
///
/// Every field is optional because extractors disagree on what they fill in;
/// defaults are applied where the metadata is presented.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    /// Media title
    #[serde(default)]
    pub title: Option<String>,
    /// Description text
    #[serde(default)]
    pub description: Option<String>,
    /// Duration in seconds (may be fractional)
    #[serde(default)]
    pub duration: Option<f64>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Uploader name
    #[serde(default)]
    pub uploader: Option<String>,
    /// View count
    #[serde(default)]
    pub view_count: Option<u64>,
    /// Available formats, in extractor order
    #[serde(default)]
    pub formats: Vec<MediaFormat>,
}

/// One format entry from [`MediaInfo::formats`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaFormat {
    /// Format identifier
    #[serde(default)]
    pub format_id: Option<String>,
    /// Container extension
    #[serde(default)]
    pub ext: Option<String>,
    /// Resolution label
    #[serde(default)]
    pub resolution: Option<String>,
    /// Exact size in bytes
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Video codec
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio codec
    #[serde(default)]
    pub acodec: Option<String>,
}

/// Everything a fetcher needs to perform one download
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL
    pub url: String,
    /// Options submitted with the job
    pub options: DownloadOptions,
    /// Directory the artifact is written into
    pub output_dir: PathBuf,
    /// Target codec for audio extraction
    pub audio_codec: String,
    /// Target bitrate (kbps) for audio extraction
    pub audio_quality: String,
}

/// Progress reported by a fetcher during [`Fetcher::download`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Bytes are flowing
    Downloading {
        /// Bytes transferred so far
        downloaded_bytes: u64,
        /// Total (or estimated total) bytes, if known
        total_bytes: Option<u64>,
        /// Bytes per second, if known
        speed: Option<f64>,
        /// Seconds remaining, if known
        eta: Option<u64>,
    },
    /// One stream finished transferring (a muxed download has several)
    StreamFinished,
}

/// Receiver of [`ProgressEvent`]s, called on the fetcher's thread
pub trait ProgressSink: Send + Sync {
    /// Deliver one event; must not block
    fn report(&self, event: ProgressEvent);
}

/// Result of a successful download
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Final artifact path, when the fetcher knows it
    pub output_path: Option<PathBuf>,
}

/// Trait for media fetching
///
/// Implementations wrap an external downloader (or stand in for a missing
/// one). Both operations block for as long as the work takes; callers run
/// them on a blocking thread (`tokio::task::spawn_blocking`), never on the
/// async executor.
///
/// # Examples
///
/// ```no_run
/// use vidvault::fetcher::{Fetcher, YtDlpFetcher};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// let info = fetcher.extract_info("https://www.youtube.com/watch?v=dQw4w9WgXcQ")?;
/// println!("{:?}", info.title);
/// # Ok(())
/// # }
/// ```
pub trait Fetcher: Send + Sync {
    /// Extract metadata without downloading
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`](crate::Error::Extraction) when the URL
    /// yields no metadata, or a tool error when the fetcher cannot run.
    fn extract_info(&self, url: &str) -> crate::Result<MediaInfo>;

    /// Download the media described by `request`
    ///
    /// Progress goes to `progress` zero or more times. The fetcher stops and
    /// returns [`Error::Cancelled`](crate::Error::Cancelled) soon after
    /// `cancel` fires.
    fn download(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> crate::Result<FetchOutcome>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
