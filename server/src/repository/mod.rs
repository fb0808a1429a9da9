//! C2: the Job Repository abstraction boundary (spec §4.2, §6.1).
//!
//! `jobs` and `dlq` are two logical collections; every implementation must
//! give [`JobRepository::claim_next_pending`] atomicity with respect to
//! concurrent callers — that's the one correctness property the rest of
//! the engine leans on.

pub mod memory;
pub mod mongo;

pub use memory::InMemoryJobRepository;
pub use mongo::MongoJobRepository;

use crate::job::{Job, JobPatch, JobState};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("a job with id '{0}' already exists")]
    DuplicateId(String),
    #[error("job '{0}' not found")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// A trimmed view of the fields a DLQ listing exposes (SPEC_FULL.md §F):
/// the original only ever surfaces `id`, `command`, `attempts` for
/// quarantined jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct DlqEntry {
    pub id: String,
    pub command: String,
    pub attempts: u32,
}

impl From<&Job> for DlqEntry {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            command: job.command.clone(),
            attempts: job.attempts,
        }
    }
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a freshly-built job into `jobs`. Fails with `DuplicateId` if
    /// `job.id` is already present in `jobs` or `dlq`.
    async fn insert(&self, job: Job) -> Result<Job, RepoError>;

    /// Fetch a single job from `jobs` by id, if present.
    async fn find_one(&self, id: &str) -> Result<Option<Job>, RepoError>;

    /// Apply a partial update to a job in `jobs`. Fails with `NotFound` if
    /// no row matches. `updated_at` is always refreshed.
    async fn update(&self, id: &str, patch: JobPatch, now: chrono::DateTime<chrono::Utc>) -> Result<Job, RepoError>;

    /// List jobs in `jobs`, optionally filtered to a single state.
    async fn find(&self, filter: Option<JobState>) -> Result<Vec<Job>, RepoError>;

    /// Count jobs in `jobs`, optionally filtered to a single state.
    async fn count(&self, filter: Option<JobState>) -> Result<u64, RepoError>;

    /// Atomically claim the oldest pending job for `worker_id`, or `None`
    /// if there isn't one.
    async fn claim_next_pending(&self, worker_id: u32, now: chrono::DateTime<chrono::Utc>) -> Result<Option<Job>, RepoError>;

    /// Atomically transition every matching `processing` row to `target`.
    /// `worker_id = None` matches every processing row (graceful stop);
    /// `Some(id)` scopes the reset to that worker's own rows (crash
    /// reset). Returns the number of rows modified.
    async fn reset_processing(
        &self,
        worker_id: Option<u32>,
        target: JobState,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, RepoError>;

    /// Move `job` into `dlq` (idempotent on id) and delete it from `jobs`.
    async fn move_to_dlq(&self, job: Job) -> Result<(), RepoError>;

    async fn dlq_list(&self) -> Result<Vec<DlqEntry>, RepoError>;

    async fn dlq_find(&self, id: &str) -> Result<Option<Job>, RepoError>;

    async fn dlq_delete(&self, id: &str) -> Result<(), RepoError>;

    /// Move a job out of `dlq` back into `jobs` as a fresh `pending` retry
    /// (spec §4.5): resets `attempts` to 0 and returns the revived job.
    /// Fails with `NotFound` if `id` isn't in `dlq`. Inserts into `jobs`
    /// before removing from `dlq`, mirroring `move_to_dlq`'s own
    /// insert-then-delete order, so a failed insert leaves the row
    /// recoverable in `dlq` rather than lost from both collections. This
    /// bypasses `insert`'s cross-collection duplicate check, since the id
    /// is known to already belong to this same job, not a colliding one.
    async fn dlq_retry(&self, id: &str, now: chrono::DateTime<chrono::Utc>) -> Result<Job, RepoError>;

    /// Propagate a new `max_retries` ceiling to every existing row in both
    /// `jobs` and `dlq` (spec §4.3). Returns the number of rows modified.
    async fn bulk_set_max_retries(&self, max_retries: u32, now: chrono::DateTime<chrono::Utc>) -> Result<u64, RepoError>;
}
