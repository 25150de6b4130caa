//! Parsers for yt-dlp output

use super::traits::{MediaInfo, ProgressEvent};
use std::path::PathBuf;

/// Prefix of the progress lines produced by [`PROGRESS_TEMPLATE`]
pub(crate) const PROGRESS_TAG: &str = "VIDVAULT_PROGRESS";

/// Prefix of the final-path line produced by [`PATH_TEMPLATE`]
pub(crate) const PATH_TAG: &str = "VIDVAULT_PATH";

/// `--progress-template` value; missing fields render as `NA`
pub(crate) const PROGRESS_TEMPLATE: &str = "download:VIDVAULT_PROGRESS %(progress.status)s \
     %(progress.downloaded_bytes)s %(progress.total_bytes)s \
     %(progress.total_bytes_estimate)s %(progress.speed)s %(progress.eta)s";

/// `--print` value emitting the artifact path after all post-processing
pub(crate) const PATH_TEMPLATE: &str = "after_move:VIDVAULT_PATH %(filepath)s";

/// One classified line of yt-dlp stdout
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputLine {
    /// A progress update
    Progress(ProgressEvent),
    /// The final artifact path
    Path(PathBuf),
    /// Anything else
    Other,
}

/// Classify one stdout line
pub(crate) fn parse_output_line(line: &str) -> OutputLine {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PATH_TAG) {
        let path = rest.trim();
        if path.is_empty() || path == "NA" {
            return OutputLine::Other;
        }
        return OutputLine::Path(PathBuf::from(path));
    }

    match line.strip_prefix(PROGRESS_TAG) {
        Some(rest) => parse_progress_fields(rest)
            .map(OutputLine::Progress)
            .unwrap_or(OutputLine::Other),
        None => OutputLine::Other,
    }
}

fn parse_progress_fields(rest: &str) -> Option<ProgressEvent> {
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let [status, downloaded, total, estimate, speed, eta] = fields.as_slice() else {
        return None;
    };

    match *status {
        "finished" => Some(ProgressEvent::StreamFinished),
        "downloading" => Some(ProgressEvent::Downloading {
            downloaded_bytes: parse_number(downloaded).map(|v| v as u64).unwrap_or(0),
            total_bytes: parse_number(total)
                .or_else(|| parse_number(estimate))
                .map(|v| v as u64)
                .filter(|v| *v > 0),
            speed: parse_number(speed),
            eta: parse_number(eta).map(|v| v as u64),
        }),
        _ => None,
    }
}

/// Parse a yt-dlp template value; `NA`/`None` and negatives are absent
fn parse_number(field: &str) -> Option<f64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse the JSON emitted by `--dump-json`
pub(crate) fn parse_media_info(stdout: &[u8]) -> crate::Result<MediaInfo> {
    serde_json::from_slice(stdout)
        .map_err(|e| crate::Error::Extraction(format!("yt-dlp returned invalid metadata: {}", e)))
}

/// Pick the most useful line of yt-dlp stderr for an error message
pub(crate) fn summarize_stderr(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_downloading_line_with_known_total() {
        let line = "VIDVAULT_PROGRESS downloading 1048576 4194304 NA 524288.5 6";
        assert_eq!(
            parse_output_line(line),
            OutputLine::Progress(ProgressEvent::Downloading {
                downloaded_bytes: 1_048_576,
                total_bytes: Some(4_194_304),
                speed: Some(524_288.5),
                eta: Some(6),
            })
        );
    }

    #[test]
    fn falls_back_to_estimated_total() {
        let line = "VIDVAULT_PROGRESS downloading 2048 NA 10240.0 NA NA";
        match parse_output_line(line) {
            OutputLine::Progress(ProgressEvent::Downloading {
                total_bytes,
                speed,
                eta,
                ..
            }) => {
                assert_eq!(total_bytes, Some(10_240));
                assert_eq!(speed, None);
                assert_eq!(eta, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_total_stays_none() {
        let line = "VIDVAULT_PROGRESS downloading 2048 NA NA NA NA";
        match parse_output_line(line) {
            OutputLine::Progress(ProgressEvent::Downloading { total_bytes, .. }) => {
                assert_eq!(total_bytes, None)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_finished_stream() {
        let line = "VIDVAULT_PROGRESS finished 4194304 4194304 NA NA NA";
        assert_eq!(
            parse_output_line(line),
            OutputLine::Progress(ProgressEvent::StreamFinished)
        );
    }

    #[test]
    fn parses_final_path_with_spaces() {
        let line = "VIDVAULT_PATH /srv/downloads/My Song_Some Artist.mp3";
        assert_eq!(
            parse_output_line(line),
            OutputLine::Path(PathBuf::from("/srv/downloads/My Song_Some Artist.mp3"))
        );
    }

    #[test]
    fn ignores_unrelated_and_truncated_lines() {
        assert_eq!(
            parse_output_line("[youtube] abc: Downloading webpage"),
            OutputLine::Other
        );
        assert_eq!(
            parse_output_line("VIDVAULT_PROGRESS downloading 12"),
            OutputLine::Other
        );
        assert_eq!(parse_output_line("VIDVAULT_PATH NA"), OutputLine::Other);
    }

    #[test]
    fn media_info_tolerates_missing_and_null_fields() {
        let json = br#"{
            "title": "Clip",
            "duration": 12.5,
            "view_count": null,
            "formats": [{"format_id": "18", "ext": "mp4", "filesize": null}]
        }"#;
        let info = parse_media_info(json).unwrap();

        assert_eq!(info.title.as_deref(), Some("Clip"));
        assert_eq!(info.duration, Some(12.5));
        assert_eq!(info.view_count, None);
        assert_eq!(info.uploader, None);
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].format_id.as_deref(), Some("18"));
    }

    #[test]
    fn invalid_metadata_is_extraction_error() {
        let err = parse_media_info(b"not json").unwrap_err();
        assert!(matches!(err, crate::Error::Extraction(_)));
    }

    #[test]
    fn stderr_summary_prefers_error_line() {
        let stderr = "WARNING: something odd\nERROR: [generic] 'not-a-url' is not a valid URL\n\n";
        assert_eq!(
            summarize_stderr(stderr).as_deref(),
            Some("ERROR: [generic] 'not-a-url' is not a valid URL")
        );
        assert_eq!(
            summarize_stderr("plain failure").as_deref(),
            Some("plain failure")
        );
        assert_eq!(summarize_stderr("  \n"), None);
    }
}
