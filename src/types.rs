//! Core types for vidvault

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random (v4) identifier
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Job status
///
/// Transitions only move forward:
///
/// ```text
/// starting -> processing -> downloading -> finished
///                        \-------------------^
/// {starting, processing, downloading} -> error | cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for the runner to pick it up
    Starting,
    /// Runner started; metadata not yet known or no byte progress yet
    Processing,
    /// Fetcher is reporting byte-level progress
    Downloading,
    /// Artifact written and resolved
    Finished,
    /// Failed with error
    Error,
    /// Cancelled by request or shutdown
    Cancelled,
}

impl JobStatus {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Error | JobStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Finished | Error | Cancelled, _) => false,
            (_, Error | Cancelled) => true,
            (Starting, Processing) => true,
            (Processing, Downloading | Finished) => true,
            (Downloading, Downloading | Finished) => true,
            _ => false,
        }
    }

    /// Lowercase name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Downloading => "downloading",
            JobStatus::Finished => "finished",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of artifact a download produces
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadType {
    /// Muxed best video + audio, mp4 preferred (default)
    #[default]
    Video,
    /// Audio only, transcoded to the configured codec
    Audio,
    /// Best video + best audio without container preference
    Full,
}

/// Options submitted with a download request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DownloadOptions {
    /// Kind of artifact to produce
    #[serde(default)]
    pub download_type: DownloadType,

    /// Explicit format selector ("best" lets the download type decide)
    #[serde(default = "default_best")]
    pub format: String,

    /// Quality hint such as "720p" ("best" for no cap)
    #[serde(default = "default_best")]
    pub quality: String,

    /// Clip start in seconds
    #[serde(default)]
    pub start_time: Option<u64>,

    /// Clip end in seconds
    #[serde(default)]
    pub end_time: Option<u64>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            download_type: DownloadType::default(),
            format: default_best(),
            quality: default_best(),
            start_time: None,
            end_time: None,
        }
    }
}

fn default_best() -> String {
    "best".to_string()
}

/// One tracked download request and its mutable lifecycle state
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Job identifier
    #[serde(rename = "download_id")]
    pub id: JobId,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f64,
    /// Bytes transferred so far
    pub downloaded_bytes: u64,
    /// Total bytes, 0 while unknown
    pub total_bytes: u64,
    /// Current speed in bytes per second
    pub speed: f64,
    /// Estimated seconds remaining
    pub eta: u64,
    /// Failure message (only when status is `error`)
    #[serde(default)]
    pub error: Option<String>,
    /// Media title, empty until metadata is known
    pub title: String,
    /// Resolved artifact path
    #[schema(value_type = Option<String>)]
    pub output_path: Option<PathBuf>,
    /// Submitted URL
    pub url: String,
    /// Submitted options
    pub options: DownloadOptions,
    /// When the job was created
    pub start_time: DateTime<Utc>,
    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a job in the `starting` state
    pub fn new(id: JobId, url: impl Into<String>, options: DownloadOptions) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Starting,
            progress: 0.0,
            downloaded_bytes: 0,
            total_bytes: 0,
            speed: 0.0,
            eta: 0,
            error: None,
            title: String::new(),
            output_path: None,
            url: url.into(),
            options,
            start_time: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into this job.
    ///
    /// Returns `false` (leaving the job untouched) when the job is already
    /// terminal or the update carries an illegal status transition.
    pub fn apply(&mut self, update: JobUpdate) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if let Some(next) = update.status
            && !self.status.can_transition_to(next)
        {
            return false;
        }

        let next_status = update.status.unwrap_or(self.status);

        if let Some(progress) = update.progress {
            let progress = progress.clamp(0.0, 100.0);
            self.progress = if self.status == JobStatus::Downloading
                && next_status == JobStatus::Downloading
            {
                self.progress.max(progress)
            } else {
                progress
            };
        }
        if let Some(bytes) = update.downloaded_bytes {
            self.downloaded_bytes = bytes;
        }
        if let Some(bytes) = update.total_bytes {
            self.total_bytes = bytes;
        }
        if let Some(speed) = update.speed {
            self.speed = speed.max(0.0);
        }
        if let Some(eta) = update.eta {
            self.eta = eta;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(path) = update.output_path {
            self.output_path = Some(path);
        }

        self.status = next_status;
        self.updated_at = Utc::now();
        true
    }
}

/// Partial update to a [`Job`]; `None` fields are left as they are
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobUpdate {
    /// New status
    pub status: Option<JobStatus>,
    /// New progress percentage
    pub progress: Option<f64>,
    /// New downloaded byte count
    pub downloaded_bytes: Option<u64>,
    /// New total byte count
    pub total_bytes: Option<u64>,
    /// New speed
    pub speed: Option<f64>,
    /// New eta
    pub eta: Option<u64>,
    /// Failure message
    pub error: Option<String>,
    /// Resolved title
    pub title: Option<String>,
    /// Resolved artifact path
    pub output_path: Option<PathBuf>,
}

impl JobUpdate {
    /// Update that only changes the status
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Terminal success: progress pinned to 100, speed/eta zeroed, byte
    /// counters left as last reported
    pub fn finished(title: String, output_path: PathBuf) -> Self {
        Self {
            status: Some(JobStatus::Finished),
            progress: Some(100.0),
            speed: Some(0.0),
            eta: Some(0),
            title: Some(title),
            output_path: Some(output_path),
            ..Default::default()
        }
    }

    /// Terminal failure: progress reset to 0
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            progress: Some(0.0),
            speed: Some(0.0),
            eta: Some(0),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Summary of one available format, as returned by the info endpoint
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FormatSummary {
    /// Fetcher-specific format identifier
    pub format_id: String,
    /// Container extension
    pub ext: String,
    /// Resolution label ("1920x1080", "audio only", "N/A")
    pub resolution: String,
    /// Size in bytes, when known
    pub filesize: Option<u64>,
    /// Video codec ("none" for audio-only, "N/A" when unknown)
    pub vcodec: String,
    /// Audio codec ("none" for video-only, "N/A" when unknown)
    pub acodec: String,
}

/// Metadata returned by `POST /api/video/info`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoInfo {
    /// Media title
    pub title: String,
    /// Description text
    pub description: String,
    /// Duration in seconds
    pub duration: u64,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Uploader name
    pub uploader: String,
    /// View count
    pub view_count: u64,
    /// Up to ten available formats
    pub formats: Vec<FormatSummary>,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted
    Queued {
        /// Job ID
        id: JobId,
        /// Submitted URL
        url: String,
    },

    /// Job moved to a new status
    StatusChanged {
        /// Job ID
        id: JobId,
        /// New status
        status: JobStatus,
    },

    /// Byte-level progress
    Progress {
        /// Job ID
        id: JobId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
        /// Bytes transferred so far
        downloaded_bytes: u64,
        /// Total bytes, 0 while unknown
        total_bytes: u64,
        /// Current speed in bytes per second
        speed: f64,
    },

    /// Job finished and its artifact is available
    Finished {
        /// Job ID
        id: JobId,
        /// Resolved artifact path
        #[schema(value_type = String)]
        path: PathBuf,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// Job cancelled
    Cancelled {
        /// Job ID
        id: JobId,
    },

    /// Service is shutting down
    Shutdown,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn job_in(status: JobStatus) -> Job {
        let mut job = Job::new(JobId::new(), "https://example.com/v", Default::default());
        job.status = status;
        job
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        use JobStatus::*;
        let legal = [
            (Starting, Processing),
            (Processing, Downloading),
            (Downloading, Downloading),
            (Downloading, Finished),
            (Processing, Finished),
            (Starting, Error),
            (Processing, Error),
            (Downloading, Error),
            (Starting, Cancelled),
            (Processing, Cancelled),
            (Downloading, Cancelled),
        ];
        let all = [Starting, Processing, Downloading, Finished, Error, Cancelled];

        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn nothing_reenters_starting() {
        for from in [
            JobStatus::Starting,
            JobStatus::Processing,
            JobStatus::Downloading,
        ] {
            assert!(!from.can_transition_to(JobStatus::Starting));
        }
    }

    #[test]
    fn apply_merges_without_dropping_fields() {
        let mut job = job_in(JobStatus::Downloading);
        job.downloaded_bytes = 4096;
        job.total_bytes = 8192;

        assert!(job.apply(JobUpdate::finished(
            "Clip".into(),
            PathBuf::from("/tmp/Clip_me.mp4")
        )));

        assert_eq!(job.status, JobStatus::Finished);
        assert_eq!(job.progress, 100.0);
        assert_eq!(job.downloaded_bytes, 4096);
        assert_eq!(job.total_bytes, 8192);
        assert_eq!(job.speed, 0.0);
        assert_eq!(job.eta, 0);
    }

    #[test]
    fn apply_rejects_updates_to_terminal_jobs() {
        for status in [JobStatus::Finished, JobStatus::Error, JobStatus::Cancelled] {
            let mut job = job_in(status);
            let before = job.clone();

            assert!(!job.apply(JobUpdate {
                progress: Some(50.0),
                ..Default::default()
            }));
            assert_eq!(job.status, before.status);
            assert_eq!(job.progress, before.progress);
        }
    }

    #[test]
    fn apply_rejects_backward_transition_whole() {
        let mut job = job_in(JobStatus::Downloading);
        job.progress = 40.0;

        let rejected = job.apply(JobUpdate {
            status: Some(JobStatus::Processing),
            progress: Some(10.0),
            ..Default::default()
        });

        assert!(!rejected);
        assert_eq!(job.status, JobStatus::Downloading);
        assert_eq!(job.progress, 40.0);
    }

    #[test]
    fn progress_never_decreases_while_downloading() {
        let mut job = job_in(JobStatus::Downloading);
        job.progress = 75.5;

        assert!(job.apply(JobUpdate {
            status: Some(JobStatus::Downloading),
            progress: Some(12.0),
            ..Default::default()
        }));
        assert_eq!(job.progress, 75.5);
    }

    #[test]
    fn progress_is_clamped_to_percentage_range() {
        let mut job = job_in(JobStatus::Processing);
        job.apply(JobUpdate {
            status: Some(JobStatus::Downloading),
            progress: Some(250.0),
            ..Default::default()
        });
        assert_eq!(job.progress, 100.0);
    }

    #[test]
    fn failed_update_resets_progress() {
        let mut job = job_in(JobStatus::Downloading);
        job.progress = 63.2;

        assert!(job.apply(JobUpdate::failed("HTTP Error 404")));
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, 0.0);
        assert_eq!(job.error.as_deref(), Some("HTTP Error 404"));
    }

    #[test]
    fn job_serializes_id_as_download_id() {
        let job = job_in(JobStatus::Starting);
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["download_id"], job.id.to_string());
        assert_eq!(json["status"], "starting");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn download_options_fill_defaults() {
        let options: DownloadOptions = serde_json::from_str("{}").unwrap();

        assert_eq!(options, DownloadOptions::default());
        assert_eq!(options.download_type, DownloadType::Video);
        assert_eq!(options.format, "best");
    }

    #[test]
    fn job_id_parses_from_display() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }
}
