//! Progress translation: fetcher events to job updates.

use crate::fetcher::{ProgressEvent, ProgressSink};
use crate::types::{JobId, JobStatus, JobUpdate};
use tokio::sync::mpsc;

/// A progress event tagged with the job it belongs to
#[derive(Debug, Clone)]
pub(crate) struct ProgressMessage {
    pub(crate) job_id: JobId,
    pub(crate) event: ProgressEvent,
}

/// [`ProgressSink`] that forwards events to the runner over a channel
///
/// Called from the blocking fetcher thread; sending on an unbounded channel
/// never blocks. Events sent after the runner stopped listening are dropped.
pub(crate) struct ProgressReporter {
    job_id: JobId,
    tx: mpsc::UnboundedSender<ProgressMessage>,
}

impl ProgressReporter {
    pub(crate) fn new(job_id: JobId, tx: mpsc::UnboundedSender<ProgressMessage>) -> Self {
        Self { job_id, tx }
    }
}

impl ProgressSink for ProgressReporter {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(ProgressMessage {
            job_id: self.job_id,
            event,
        });
    }
}

/// Translate one fetcher event into a registry update
pub(crate) fn progress_update(event: &ProgressEvent) -> JobUpdate {
    match event {
        ProgressEvent::Downloading {
            downloaded_bytes,
            total_bytes,
            speed,
            eta,
        } => {
            let total = total_bytes.unwrap_or(0);
            JobUpdate {
                status: Some(JobStatus::Downloading),
                progress: Some(percentage(*downloaded_bytes, total)),
                downloaded_bytes: Some(*downloaded_bytes),
                total_bytes: Some(total),
                speed: Some(speed.unwrap_or(0.0)),
                eta: Some(eta.unwrap_or(0)),
                ..Default::default()
            }
        }
        // A stream finished but post-processing (merge, transcode) may follow;
        // the job only becomes `finished` once the artifact is resolved.
        ProgressEvent::StreamFinished => JobUpdate {
            speed: Some(0.0),
            eta: Some(0),
            ..Default::default()
        },
    }
}

/// `downloaded / total * 100`, rounded to two decimals; 0 while total is unknown
pub(crate) fn percentage(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = downloaded as f64 / total as f64 * 100.0;
    ((raw * 100.0).round() / 100.0).clamp(0.0, 100.0)
}
