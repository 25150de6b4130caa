//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::Downloader;

impl Downloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs (`submit` returns `ShuttingDown`)
    /// 2. Cancels all running jobs through their cancellation tokens
    /// 3. Waits up to `shutdown_timeout` for their runners to exit
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Job records stay queryable afterwards; jobs interrupted here end in
    /// `cancelled`.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.job_control.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new downloads");

        self.cancel_all_active().await;

        let timeout = self.config.download.shutdown_timeout;
        match tokio::time::timeout(timeout, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All running jobs stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for jobs to stop, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting(&self) -> bool {
        self.job_control.accepting_new.load(Ordering::SeqCst)
    }

    /// Number of jobs whose runner has not exited yet
    pub async fn active_count(&self) -> usize {
        self.job_control.active_jobs.lock().await.len()
    }

    async fn cancel_all_active(&self) {
        let active = self.job_control.active_jobs.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all running jobs");

        for (id, token) in active.iter() {
            tracing::debug!(job_id = %id, "Signaling cancellation");
            token.cancel();
        }
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.active_count().await;
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for running jobs to stop");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
