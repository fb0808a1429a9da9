//! An in-memory [`JobRepository`], serialising `claim_next_pending` through
//! a single mutex since there's no external find-and-modify primitive to
//! lean on (spec §4.2's fallback). Grounded on the corpus's
//! mutex-guarded-`HashMap` test doubles (e.g. `TestJobManager`); used both
//! as the default store for tests and as a dependency-free fallback when
//! no `MONGO_URI` is configured.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::job::{Job, JobPatch, JobState};

use super::{DlqEntry, JobRepository, RepoError};

struct StoredJob {
    job: Job,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, StoredJob>,
    dlq: HashMap<String, Job>,
    seq: u64,
}

#[derive(Default)]
pub struct InMemoryJobRepository {
    inner: Mutex<Inner>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn insert(&self, job: Job) -> Result<Job, RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.jobs.contains_key(&job.id) || inner.dlq.contains_key(&job.id) {
            return Err(RepoError::DuplicateId(job.id));
        }
        inner.seq += 1;
        let seq = inner.seq;
        inner.jobs.insert(job.id.clone(), StoredJob { job: job.clone(), seq });
        Ok(job)
    }

    async fn find_one(&self, id: &str) -> Result<Option<Job>, RepoError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.jobs.get(id).map(|s| s.job.clone()))
    }

    async fn update(&self, id: &str, patch: JobPatch, now: DateTime<Utc>) -> Result<Job, RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let stored = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        patch.apply_to(&mut stored.job, now);
        Ok(stored.job.clone())
    }

    async fn find(&self, filter: Option<JobState>) -> Result<Vec<Job>, RepoError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut jobs: Vec<&StoredJob> = inner
            .jobs
            .values()
            .filter(|s| filter.map_or(true, |f| s.job.state == f))
            .collect();
        jobs.sort_by_key(|s| (s.job.created_at, s.seq));
        Ok(jobs.into_iter().map(|s| s.job.clone()).collect())
    }

    async fn count(&self, filter: Option<JobState>) -> Result<u64, RepoError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .jobs
            .values()
            .filter(|s| filter.map_or(true, |f| s.job.state == f))
            .count() as u64)
    }

    async fn claim_next_pending(&self, worker_id: u32, now: DateTime<Utc>) -> Result<Option<Job>, RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let next_id = inner
            .jobs
            .values()
            .filter(|s| s.job.state == JobState::Pending)
            .min_by_key(|s| (s.job.created_at, s.seq))
            .map(|s| s.job.id.clone());

        let Some(id) = next_id else {
            return Ok(None);
        };
        let stored = inner.jobs.get_mut(&id).expect("id just looked up");
        stored.job.state = JobState::Processing;
        stored.job.worker_assigned = worker_id;
        stored.job.updated_at = now;
        Ok(Some(stored.job.clone()))
    }

    async fn reset_processing(
        &self,
        worker_id: Option<u32>,
        target: JobState,
        now: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut count = 0u64;
        for stored in inner.jobs.values_mut() {
            let matches = stored.job.state == JobState::Processing
                && worker_id.map_or(true, |id| stored.job.worker_assigned == id);
            if matches {
                stored.job.state = target;
                stored.job.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn move_to_dlq(&self, mut job: Job) -> Result<(), RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        job.state = JobState::Dead;
        if !inner.dlq.contains_key(&job.id) {
            inner.dlq.insert(job.id.clone(), job.clone());
        }
        inner.jobs.remove(&job.id);
        Ok(())
    }

    async fn dlq_list(&self) -> Result<Vec<DlqEntry>, RepoError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<DlqEntry> = inner.dlq.values().map(DlqEntry::from).collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn dlq_find(&self, id: &str) -> Result<Option<Job>, RepoError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.dlq.get(id).cloned())
    }

    async fn dlq_delete(&self, id: &str) -> Result<(), RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.dlq.remove(id);
        Ok(())
    }

    async fn dlq_retry(&self, id: &str, now: DateTime<Utc>) -> Result<Job, RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut job = inner
            .dlq
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        job.state = JobState::Pending;
        job.attempts = 0;
        job.updated_at = now;
        inner.seq += 1;
        let seq = inner.seq;
        inner.jobs.insert(job.id.clone(), StoredJob { job: job.clone(), seq });
        inner.dlq.remove(id);
        Ok(job)
    }

    async fn bulk_set_max_retries(&self, max_retries: u32, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut count = 0u64;
        for stored in inner.jobs.values_mut() {
            stored.job.max_retries = max_retries;
            stored.job.updated_at = now;
            count += 1;
        }
        for job in inner.dlq.values_mut() {
            job.max_retries = max_retries;
            job.updated_at = now;
            count += 1;
        }
        Ok(count)
    }
}
