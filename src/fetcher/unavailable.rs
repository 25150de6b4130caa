//! Fetcher used when no yt-dlp binary is available

use super::traits::{FetchOutcome, FetchRequest, Fetcher, MediaInfo, ProgressSink};
use tokio_util::sync::CancellationToken;

/// Stand-in fetcher for hosts without yt-dlp
///
/// The service still starts and serves job queries; metadata lookups fail
/// with `Error::NotSupported` and submitted downloads end in `error`.
///
/// # Examples
///
/// ```
/// use vidvault::fetcher::{Fetcher, UnavailableFetcher};
///
/// let fetcher = UnavailableFetcher;
/// assert!(fetcher.extract_info("https://example.com/v").is_err());
/// ```
pub struct UnavailableFetcher;

const MISSING_BINARY: &str = "media downloads require the external yt-dlp binary. \
     Configure ytdlp_path in config or ensure yt-dlp is in PATH.";

impl Fetcher for UnavailableFetcher {
    fn extract_info(&self, _url: &str) -> crate::Result<MediaInfo> {
        Err(crate::Error::NotSupported(MISSING_BINARY.into()))
    }

    fn download(
        &self,
        _request: &FetchRequest,
        _progress: &dyn ProgressSink,
        _cancel: &CancellationToken,
    ) -> crate::Result<FetchOutcome> {
        Err(crate::Error::NotSupported(MISSING_BINARY.into()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
