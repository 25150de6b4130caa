//! Job registry: the single owner of job state
//!
//! The [`JobRegistry`] trait is the seam between the orchestrator/runner and
//! the storage of job records. [`InMemoryJobRegistry`] is the only
//! implementation the service ships with; jobs live until the process exits.

use crate::error::{JobError, Result};
use crate::types::{Job, JobId, JobUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Result of [`JobRegistry::update`]
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update was merged
    Applied,
    /// The job exists but refused the update (terminal, or illegal transition)
    Rejected,
    /// No job with this id; late callbacks land here and are ignored
    Missing,
}

impl UpdateOutcome {
    /// Whether the update was merged
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// Storage of job records keyed by [`JobId`]
///
/// Implementations must be safe to call concurrently: runner tasks update
/// jobs while request handlers read them.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Insert a new job, failing with [`JobError::DuplicateId`] on collision
    async fn create(&self, job: Job) -> Result<JobId>;

    /// Snapshot of one job
    async fn get(&self, id: JobId) -> Result<Job>;

    /// Merge a partial update into an existing job
    ///
    /// The merge follows [`Job::apply`]: terminal jobs and illegal status
    /// transitions reject the update as a whole.
    async fn update(&self, id: JobId, update: JobUpdate) -> UpdateOutcome;

    /// Snapshot of all jobs in insertion order
    async fn list(&self) -> Vec<Job>;
}

#[derive(Default)]
struct Entries {
    jobs: HashMap<JobId, Job>,
    order: Vec<JobId>,
}

/// Process-local registry guarded by a `tokio::sync::RwLock`
#[derive(Default)]
pub struct InMemoryJobRegistry {
    inner: RwLock<Entries>,
}

impl InMemoryJobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create(&self, job: Job) -> Result<JobId> {
        let mut entries = self.inner.write().await;
        let id = job.id;
        if entries.jobs.contains_key(&id) {
            return Err(JobError::DuplicateId { id }.into());
        }
        entries.jobs.insert(id, job);
        entries.order.push(id);
        Ok(id)
    }

    async fn get(&self, id: JobId) -> Result<Job> {
        let entries = self.inner.read().await;
        entries
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| JobError::not_found(id).into())
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> UpdateOutcome {
        let mut entries = self.inner.write().await;
        let Some(job) = entries.jobs.get_mut(&id) else {
            return UpdateOutcome::Missing;
        };

        let current = job.status;
        let requested = update.status;
        if job.apply(update) {
            UpdateOutcome::Applied
        } else {
            tracing::debug!(
                job_id = %id,
                current = %current,
                requested = ?requested,
                "Rejected job update"
            );
            UpdateOutcome::Rejected
        }
    }

    async fn list(&self) -> Vec<Job> {
        let entries = self.inner.read().await;
        entries
            .order
            .iter()
            .filter_map(|id| entries.jobs.get(id).cloned())
            .collect()
    }
}
