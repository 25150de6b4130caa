//! Metadata lookup for the info endpoint.

use crate::error::{Error, Result};
use crate::fetcher::{MediaFormat, MediaInfo};
use crate::types::{FormatSummary, VideoInfo};
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

use super::Downloader;

/// Maximum number of formats returned by [`Downloader::video_info`]
pub(crate) const MAX_FORMATS: usize = 10;

const UNKNOWN: &str = "Unknown";
const NOT_AVAILABLE: &str = "N/A";

/// http(s) URL with a dotted host, `localhost` or an IPv4 address, optional port and path
const URL_PATTERN: &str = r"^https?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$";

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            RegexBuilder::new(URL_PATTERN)
                .case_insensitive(true)
                .build()
                .ok()
        })
        .as_ref()
}

/// Reject anything that does not look like an http(s) URL
pub(crate) fn validate_url(url: &str) -> Result<()> {
    let pattern =
        url_pattern().ok_or_else(|| Error::Other("URL pattern failed to compile".into()))?;
    if pattern.is_match(url.trim()) {
        Ok(())
    } else {
        Err(Error::Validation("Invalid URL format".into()))
    }
}

impl Downloader {
    /// Look up metadata for a URL without downloading
    ///
    /// Unlike [`submit`](Self::submit), this validates the URL first.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] when the URL is malformed
    /// - [`Error::Extraction`] when the fetcher cannot produce metadata
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        validate_url(url)?;

        let url = url.trim().to_string();
        let info = self
            .with_fetcher(move |fetcher| fetcher.extract_info(&url))
            .await?;

        Ok(summarize(info))
    }
}

/// Fill defaults and keep the first [`MAX_FORMATS`] formats
pub(crate) fn summarize(info: MediaInfo) -> VideoInfo {
    VideoInfo {
        title: info.title.unwrap_or_else(|| UNKNOWN.to_string()),
        description: info.description.unwrap_or_default(),
        duration: info
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u64)
            .unwrap_or(0),
        thumbnail: info.thumbnail.unwrap_or_default(),
        uploader: info.uploader.unwrap_or_else(|| UNKNOWN.to_string()),
        view_count: info.view_count.unwrap_or(0),
        formats: info
            .formats
            .into_iter()
            .take(MAX_FORMATS)
            .map(summarize_format)
            .collect(),
    }
}

fn summarize_format(format: MediaFormat) -> FormatSummary {
    FormatSummary {
        format_id: format.format_id.unwrap_or_default(),
        ext: format.ext.unwrap_or_default(),
        resolution: format
            .resolution
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        filesize: format.filesize,
        vcodec: format.vcodec.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        acodec: format.acodec.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}
