//! yt-dlp fetcher using the external yt-dlp binary

use super::parser::{
    OutputLine, PATH_TEMPLATE, PROGRESS_TEMPLATE, parse_media_info, parse_output_line,
    summarize_stderr,
};
use super::traits::{FetchOutcome, FetchRequest, Fetcher, MediaInfo, ProgressSink};
use crate::config::FetcherConfig;
use crate::error::Error;
use crate::types::{DownloadOptions, DownloadType};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Output filename template: `<title>_<uploader>.<ext>`
const OUTPUT_TEMPLATE: &str = "%(title)s_%(uploader)s.%(ext)s";

/// How often the cancel watcher and exit poll wake up
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Fetcher backed by the `yt-dlp` command-line tool
///
/// Metadata comes from `--dump-json`; downloads stream progress through a
/// custom `--progress-template` and report the final path with `--print`.
/// A watcher thread kills the child process when the job is cancelled.
///
/// # Examples
///
/// ```no_run
/// use vidvault::config::FetcherConfig;
/// use vidvault::fetcher::YtDlpFetcher;
/// use std::path::PathBuf;
///
/// // Explicit binary
/// let fetcher = YtDlpFetcher::new(PathBuf::from("/usr/local/bin/yt-dlp"), &FetcherConfig::default());
///
/// // Or auto-discover from PATH
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// ```
pub struct YtDlpFetcher {
    binary_path: PathBuf,
    retries: u32,
    extra_args: Vec<String>,
}

impl YtDlpFetcher {
    /// Create a fetcher for an explicit binary path
    pub fn new(binary_path: PathBuf, config: &FetcherConfig) -> Self {
        Self {
            binary_path,
            retries: config.retries,
            extra_args: config.extra_args.clone(),
        }
    }

    /// Attempt to find yt-dlp in PATH, using default fetcher settings
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp")
            .ok()
            .map(|path| Self::new(path, &FetcherConfig::default()))
    }

    /// Resolve the binary from configuration
    ///
    /// An explicit `ytdlp_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled. Returns `None` when neither yields a binary.
    pub fn from_config(config: &FetcherConfig) -> Option<Self> {
        if let Some(path) = &config.ytdlp_path {
            return Some(Self::new(path.clone(), config));
        }
        if config.search_path {
            return which::which("yt-dlp")
                .ok()
                .map(|path| Self::new(path, config));
        }
        None
    }

    /// Path of the binary this fetcher executes
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn retry_args(&self) -> Vec<String> {
        let retries = self.retries.to_string();
        vec![
            "--retries".into(),
            retries.clone(),
            "--fragment-retries".into(),
            retries.clone(),
            "--extractor-retries".into(),
            retries,
        ]
    }

    fn info_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--dump-json".into(),
            "--no-warnings".into(),
            "--no-playlist".into(),
        ];
        args.extend(self.retry_args());
        args.extend(self.extra_args.iter().cloned());
        args.push("--".into());
        args.push(url.into());
        args
    }

    pub(crate) fn download_args(&self, request: &FetchRequest) -> Vec<String> {
        let output = request.output_dir.join(OUTPUT_TEMPLATE);

        let mut args: Vec<String> = vec![
            "--no-playlist".into(),
            "--newline".into(),
            "--progress".into(),
            "--no-simulate".into(),
            "--no-color".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--print".into(),
            PATH_TEMPLATE.into(),
            "-f".into(),
            format_selector(&request.options),
            "-o".into(),
            output.to_string_lossy().into_owned(),
        ];
        args.extend(self.retry_args());

        if request.options.download_type == DownloadType::Audio {
            args.extend([
                "-x".into(),
                "--audio-format".into(),
                request.audio_codec.clone(),
                "--audio-quality".into(),
                format!("{}K", request.audio_quality),
            ]);
        }

        if let Some(section) = download_section(&request.options) {
            args.push("--download-sections".into());
            args.push(section);
        }

        args.extend(self.extra_args.iter().cloned());
        args.push("--".into());
        args.push(request.url.clone());
        args
    }
}

impl Fetcher for YtDlpFetcher {
    fn extract_info(&self, url: &str) -> crate::Result<MediaInfo> {
        let output = Command::new(&self.binary_path)
            .args(self.info_args(url))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Extraction(
                summarize_stderr(&stderr)
                    .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status)),
            ));
        }

        parse_media_info(&output.stdout)
    }

    fn download(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> crate::Result<FetchOutcome> {
        let mut child = Command::new(&self.binary_path)
            .args(self.download_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalTool("yt-dlp stdout was not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ExternalTool("yt-dlp stderr was not captured".into()))?;

        let stderr_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        });

        let child = Arc::new(Mutex::new(child));
        let finished = Arc::new(AtomicBool::new(false));
        let watcher = spawn_cancel_watcher(child.clone(), cancel.clone(), finished.clone());

        let mut output_path = None;
        for segment in BufReader::new(stdout).split(b'\n') {
            match segment {
                Ok(bytes) => match parse_output_line(&String::from_utf8_lossy(&bytes)) {
                    OutputLine::Progress(event) => progress.report(event),
                    OutputLine::Path(path) => output_path = Some(path),
                    OutputLine::Other => {}
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read yt-dlp output");
                    break;
                }
            }
        }

        let status = wait_for_exit(&child);
        finished.store(true, Ordering::SeqCst);
        let _ = watcher.join();
        let stderr = stderr_reader.join().unwrap_or_default();
        let status = status?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if !status.success() {
            return Err(Error::Download(
                summarize_stderr(&stderr).unwrap_or_else(|| format!("yt-dlp exited with {}", status)),
            ));
        }

        Ok(FetchOutcome { output_path })
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Kill `child` once `cancel` fires; exits when `finished` is set
///
/// [`Fetcher::download`] is synchronous and runs on the blocking pool, so the
/// child is a `std::process::Child` with no async wait to select against the
/// token; both sides poll every [`WATCH_INTERVAL`] instead.
fn spawn_cancel_watcher(
    child: Arc<Mutex<Child>>,
    cancel: CancellationToken,
    finished: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !finished.load(Ordering::SeqCst) {
            if cancel.is_cancelled() {
                if let Ok(mut child) = child.lock()
                    && let Err(e) = child.kill()
                {
                    tracing::warn!(error = %e, "Failed to kill yt-dlp process");
                }
                return;
            }
            thread::sleep(WATCH_INTERVAL);
        }
    })
}

/// Poll for exit without holding the lock, so the watcher can still kill
fn wait_for_exit(child: &Mutex<Child>) -> crate::Result<ExitStatus> {
    loop {
        let status = child
            .lock()
            .map_err(|_| Error::Other("yt-dlp process handle poisoned".into()))?
            .try_wait()?;
        if let Some(status) = status {
            return Ok(status);
        }
        thread::sleep(WATCH_INTERVAL);
    }
}

/// Container extensions accepted as a `format` hint
const CONTAINER_HINTS: &[&str] = &[
    "mp4", "webm", "mkv", "mov", "flv", "3gp", "m4a", "mp3", "ogg", "opus", "wav", "aac", "flac",
];

/// Build the `-f` selector for a request
///
/// `best` (or blank) leaves the choice to the download type. A bare container
/// extension such as `mp4` narrows the download type's selector with an
/// `[ext=...]` filter and keeps unfiltered fallbacks. Anything else is treated
/// as a full yt-dlp selector expression and passed through untouched. A
/// numeric quality such as `720p` caps the height of video streams.
pub(crate) fn format_selector(options: &DownloadOptions) -> String {
    let format = options.format.trim();
    let height = quality_height(&options.quality);

    if format.is_empty() || format.eq_ignore_ascii_case("best") {
        return default_selector(options.download_type, height);
    }

    let hint = format.to_ascii_lowercase();
    if CONTAINER_HINTS.contains(&hint.as_str()) {
        return container_selector(options.download_type, &hint, height);
    }

    format.to_string()
}

fn default_selector(download_type: DownloadType, height: Option<u32>) -> String {
    match (download_type, height) {
        (DownloadType::Audio, _) => "bestaudio/best".into(),
        (DownloadType::Video, None) => {
            "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best".into()
        }
        (DownloadType::Video, Some(h)) => format!(
            "best[ext=mp4][height<={h}]/bestvideo[ext=mp4][height<={h}]+bestaudio[ext=m4a]/best[height<={h}]/best"
        ),
        (DownloadType::Full, None) => "bestvideo+bestaudio/best".into(),
        (DownloadType::Full, Some(h)) => {
            format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]/best")
        }
    }
}

fn container_selector(download_type: DownloadType, ext: &str, height: Option<u32>) -> String {
    let cap = height.map(|h| format!("[height<={h}]")).unwrap_or_default();
    let capped_fallback = if cap.is_empty() { String::new() } else { format!("best{cap}/") };
    match download_type {
        DownloadType::Audio => {
            // Audio-only streams for an mp4 container are tagged m4a
            let ext = if ext == "mp4" { "m4a" } else { ext };
            format!("bestaudio[ext={ext}]/bestaudio/best")
        }
        DownloadType::Video => {
            format!("best[ext={ext}]{cap}/bestvideo[ext={ext}]{cap}+bestaudio/{capped_fallback}best")
        }
        DownloadType::Full => format!(
            "bestvideo[ext={ext}]{cap}+bestaudio/best[ext={ext}]{cap}/bestvideo{cap}+bestaudio/best"
        ),
    }
}

/// Parse a quality hint like `720p` or `1080` into a maximum height
fn quality_height(quality: &str) -> Option<u32> {
    let quality = quality.trim();
    let digits = quality.strip_suffix(['p', 'P']).unwrap_or(quality);
    digits.parse::<u32>().ok().filter(|h| *h > 0)
}

/// `--download-sections` value for a clip request, if any bound is set
fn download_section(options: &DownloadOptions) -> Option<String> {
    if options.start_time.is_none() && options.end_time.is_none() {
        return None;
    }
    let start = options.start_time.unwrap_or(0);
    let end = options
        .end_time
        .map(|e| e.to_string())
        .unwrap_or_else(|| "inf".into());
    Some(format!("*{}-{}", start, end))
}
