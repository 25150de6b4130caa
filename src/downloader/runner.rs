//! Job runner: drives one job from `starting` to a terminal state.

use crate::error::{Error, Result};
use crate::fetcher::{FetchRequest, Fetcher};
use crate::registry::UpdateOutcome;
use crate::types::{Event, JobId, JobStatus, JobUpdate};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::Downloader;
use super::artifact::resolve_artifact;
use super::progress::{ProgressMessage, ProgressReporter, progress_update};

/// Title used when the fetcher reports none
const FALLBACK_TITLE: &str = "unknown_video";

impl Downloader {
    /// Run a job to completion
    ///
    /// Every failure ends up in the registry as an `error` status; nothing is
    /// returned to the submitter. The job's entry in the active map is
    /// removed on exit, which is what shutdown waits for.
    pub(crate) async fn run_job(&self, id: JobId, cancel: CancellationToken) {
        match self.drive_job(id, &cancel).await {
            Ok(()) => {}
            Err(Error::Cancelled) => self.settle_cancelled(id).await,
            Err(e) => self.fail_job(id, e).await,
        }

        self.job_control.active_jobs.lock().await.remove(&id);
    }

    async fn drive_job(&self, id: JobId, cancel: &CancellationToken) -> Result<()> {
        // Jobs beyond the concurrency limit wait here, still `starting`
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            permit = self.job_control.concurrent_limit.clone().acquire_owned() => {
                permit.map_err(|_| Error::ShuttingDown)?
            }
        };

        let job = self.registry.get(id).await?;
        if !self.transition(id, JobUpdate::status(JobStatus::Processing)).await {
            return Err(Error::Cancelled);
        }
        self.emit_event(Event::StatusChanged {
            id,
            status: JobStatus::Processing,
        });
        tracing::debug!(job_id = %id, "Job processing");

        let url = job.url.clone();
        let info = self
            .with_fetcher(move |fetcher| fetcher.extract_info(&url))
            .await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let title = info
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());
        let _ = self
            .registry
            .update(
                id,
                JobUpdate {
                    title: Some(title.clone()),
                    ..Default::default()
                },
            )
            .await;

        let output_dir = self.config.download_dir().clone();
        let request = FetchRequest {
            url: job.url,
            options: job.options,
            output_dir: output_dir.clone(),
            audio_codec: self.config.download.audio_codec.clone(),
            audio_quality: self.config.download.audio_quality.clone(),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(id, tx);
        let fetcher = self.fetcher.clone();
        let token = cancel.clone();
        let download = tokio::task::spawn_blocking(move || {
            fetcher.download(&request, &reporter, &token)
        });

        // The channel closes when the blocking call returns and drops the reporter
        let mut announced = false;
        while let Some(message) = rx.recv().await {
            self.apply_progress(message, &mut announced).await;
        }

        let outcome = download
            .await
            .map_err(|e| Error::Other(format!("download task failed: {}", e)))??;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let path = resolve_artifact(id, outcome.output_path, &output_dir).await?;

        match self
            .registry
            .update(id, JobUpdate::finished(title, path.clone()))
            .await
        {
            UpdateOutcome::Applied => {
                tracing::info!(job_id = %id, path = %path.display(), "Job finished");
                self.emit_event(Event::StatusChanged {
                    id,
                    status: JobStatus::Finished,
                });
                self.emit_event(Event::Finished { id, path });
            }
            UpdateOutcome::Rejected | UpdateOutcome::Missing => {
                tracing::debug!(job_id = %id, "Finished job was already settled");
            }
        }

        Ok(())
    }

    /// Apply one progress message, emitting events for what changed
    async fn apply_progress(&self, message: ProgressMessage, announced: &mut bool) {
        let ProgressMessage { job_id, event } = message;
        let update = progress_update(&event);
        let downloading = update.status == Some(JobStatus::Downloading);

        if !self.transition(job_id, update.clone()).await || !downloading {
            return;
        }

        if !*announced {
            *announced = true;
            self.emit_event(Event::StatusChanged {
                id: job_id,
                status: JobStatus::Downloading,
            });
        }

        let Ok(job) = self.registry.get(job_id).await else {
            return;
        };
        self.emit_event(Event::Progress {
            id: job_id,
            percent: job.progress,
            downloaded_bytes: job.downloaded_bytes,
            total_bytes: job.total_bytes,
            speed: job.speed,
        });
    }

    /// Apply an update, reporting whether it was merged
    async fn transition(&self, id: JobId, update: JobUpdate) -> bool {
        self.registry.update(id, update).await.is_applied()
    }

    async fn fail_job(&self, id: JobId, error: Error) {
        let message = error.to_string();
        if self.transition(id, JobUpdate::failed(message.clone())).await {
            tracing::warn!(job_id = %id, error = %message, "Job failed");
            self.emit_event(Event::StatusChanged {
                id,
                status: JobStatus::Error,
            });
            self.emit_event(Event::Failed { id, error: message });
        } else {
            tracing::debug!(job_id = %id, error = %message, "Ignoring failure of settled job");
        }
    }

    /// Record a cancellation that did not come through [`cancel`](Self::cancel),
    /// e.g. shutdown firing the token
    async fn settle_cancelled(&self, id: JobId) {
        if self
            .transition(id, JobUpdate::status(JobStatus::Cancelled))
            .await
        {
            tracing::info!(job_id = %id, "Job cancelled by shutdown");
            self.emit_event(Event::Cancelled { id });
        }
    }

    /// Run a blocking fetcher call on the blocking thread pool
    pub(crate) async fn with_fetcher<T, F>(&self, call: F) -> Result<T>
    where
        F: FnOnce(&dyn Fetcher) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let fetcher = self.fetcher.clone();
        tokio::task::spawn_blocking(move || call(fetcher.as_ref()))
            .await
            .map_err(|e| Error::Other(format!("fetcher task failed: {}", e)))?
    }
}
