//! Job control: submission, queries and cancellation.

use crate::error::{Error, JobError, Result};
use crate::registry::UpdateOutcome;
use crate::types::{DownloadOptions, Event, Job, JobId, JobStatus, JobUpdate};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::Downloader;

impl Downloader {
    /// Submit a download job
    ///
    /// The URL is not validated here: a malformed URL is accepted and the job
    /// ends in `error` once its runner tries to fetch it. The runner is
    /// spawned in the background and the id returned immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has
    /// begun.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use vidvault::*;
    /// # async fn example(downloader: Downloader) -> Result<()> {
    /// let id = downloader
    ///     .submit("https://www.youtube.com/watch?v=dQw4w9WgXcQ", DownloadOptions::default())
    ///     .await?;
    /// println!("status: {}", downloader.status(id).await?.status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, url: impl Into<String>, options: DownloadOptions) -> Result<JobId> {
        if !self.job_control.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let url = url.into();
        let id = JobId::new();
        let token = CancellationToken::new();

        // Register the token before the job becomes visible so a cancel
        // arriving right after submit always finds it.
        self.job_control
            .active_jobs
            .lock()
            .await
            .insert(id, token.clone());

        if let Err(e) = self
            .registry
            .create(Job::new(id, url.clone(), options))
            .await
        {
            self.job_control.active_jobs.lock().await.remove(&id);
            return Err(e);
        }

        tracing::info!(job_id = %id, url = %url, "Job submitted");
        self.emit_event(Event::Queued { id, url });

        let downloader = self.clone();
        tokio::spawn(async move {
            downloader.run_job(id, token).await;
        });

        Ok(id)
    }

    /// Snapshot of one job
    pub async fn status(&self, id: JobId) -> Result<Job> {
        self.registry.get(id).await
    }

    /// Snapshot of every job, in submission order
    pub async fn list_all(&self) -> Vec<Job> {
        self.registry.list().await
    }

    /// Cancel a job
    ///
    /// The status flips to `cancelled` first, then the job's cancellation
    /// token fires so the fetcher stops. `cancelled` is terminal: the
    /// runner's later `finished`/`error` updates are rejected.
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] for an unknown id
    /// - [`JobError::InvalidState`] when the job already finished or failed
    ///
    /// Cancelling an already cancelled job succeeds without doing anything.
    pub async fn cancel(&self, id: JobId) -> Result<()> {
        let job = self.registry.get(id).await?;

        match job.status {
            JobStatus::Cancelled => return Ok(()),
            JobStatus::Finished | JobStatus::Error => {
                return Err(invalid_cancel(id, job.status));
            }
            JobStatus::Starting | JobStatus::Processing | JobStatus::Downloading => {}
        }

        match self
            .registry
            .update(id, JobUpdate::status(JobStatus::Cancelled))
            .await
        {
            UpdateOutcome::Applied => {}
            UpdateOutcome::Missing => return Err(JobError::not_found(id).into()),
            UpdateOutcome::Rejected => {
                // Lost a race with the runner reaching a terminal state
                let current = self.registry.get(id).await?.status;
                if current == JobStatus::Cancelled {
                    return Ok(());
                }
                return Err(invalid_cancel(id, current));
            }
        }

        if let Some(token) = self.job_control.active_jobs.lock().await.get(&id) {
            token.cancel();
        }

        tracing::info!(job_id = %id, previous = %job.status, "Job cancelled");
        self.emit_event(Event::Cancelled { id });
        Ok(())
    }

    /// Path of a finished job's artifact, checked to exist on disk
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] for an unknown id
    /// - [`JobError::NotFinished`] when the job is not `finished`
    /// - [`JobError::ArtifactMissing`] when no path was recorded or the file is gone
    pub async fn artifact_path(&self, id: JobId) -> Result<PathBuf> {
        let job = self.registry.get(id).await?;

        if job.status != JobStatus::Finished {
            return Err(JobError::NotFinished {
                id,
                status: job.status.to_string(),
            }
            .into());
        }

        let Some(path) = job.output_path else {
            return Err(JobError::ArtifactMissing {
                id,
                path: PathBuf::new(),
            }
            .into());
        };

        let exists = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !exists {
            return Err(JobError::ArtifactMissing { id, path }.into());
        }

        Ok(path)
    }
}

fn invalid_cancel(id: JobId, status: JobStatus) -> Error {
    JobError::InvalidState {
        id,
        operation: "cancel".to_string(),
        current_state: status.to_string(),
    }
    .into()
}
