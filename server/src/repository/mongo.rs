//! The production [`JobRepository`], backed by MongoDB. Grounded on the
//! corpus's `mongodb` usage (`slavalslutkovsky-nx-playground/libs/database`)
//! for connection setup, and on `examples/original_source/src/base.py` and
//! `worker.py` for the exact collections (`jobs`, `dlq`) and query shapes —
//! this is a direct Rust rendition of the PyMongo calls the original makes.
//!
//! `claim_next_pending` leans on `find_one_and_update`, Mongo's native
//! find-and-modify primitive, which is what makes it atomic across workers
//! without any in-process lock (spec §4.2, §9 "Atomic claim").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use std::time::Duration;

use crate::job::{Job, JobPatch, JobState};
use crate::time_format::to_rfc3339_z;

use super::{DlqEntry, JobRepository, RepoError};

const DATABASE_NAME: &str = "queueCLI";
const JOBS_COLLECTION: &str = "jobs";
const DLQ_COLLECTION: &str = "dlq";

pub struct MongoJobRepository {
    jobs: Collection<Job>,
    dlq: Collection<Job>,
}

impl MongoJobRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            jobs: db.collection(JOBS_COLLECTION),
            dlq: db.collection(DLQ_COLLECTION),
        }
    }

    /// Connect using a `MONGO_URI`-style connection string (spec §6.3),
    /// verifying reachability the same way the shared connector in the
    /// corpus does.
    pub async fn connect(uri: &str) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.connect_timeout = Some(Duration::from_secs(10));
        options.server_selection_timeout = Some(Duration::from_secs(30));
        let client = Client::with_options(options)?;
        client.list_database_names().await?;
        let db = client.database(DATABASE_NAME);
        Ok(Self::new(&db))
    }
}

fn patch_to_set_doc(patch: &JobPatch, now: DateTime<Utc>) -> mongodb::bson::Document {
    let mut set = doc! { "updated_at": to_rfc3339_z(now) };
    if let Some(v) = &patch.command {
        set.insert("command", v.clone());
    }
    if let Some(v) = patch.state {
        set.insert("state", v.to_string());
    }
    if let Some(v) = patch.attempts {
        set.insert("attempts", v as i64);
    }
    if let Some(v) = patch.max_retries {
        set.insert("max_retries", v as i64);
    }
    if let Some(v) = patch.timeout {
        set.insert("timeout", v as i64);
    }
    if let Some(v) = patch.worker_assigned {
        set.insert("worker_assigned", v as i64);
    }
    set
}

fn store_err(e: mongodb::error::Error) -> RepoError {
    RepoError::Store(anyhow::anyhow!(e))
}

#[async_trait]
impl JobRepository for MongoJobRepository {
    async fn insert(&self, job: Job) -> Result<Job, RepoError> {
        // Mirrors the original's check-then-insert; a unique index on
        // `id` is still recommended for defense in depth, but this keeps
        // the same observable semantics as examples/original_source.
        if self.find_one(&job.id).await?.is_some() || self.dlq_find(&job.id).await?.is_some() {
            return Err(RepoError::DuplicateId(job.id));
        }
        self.jobs.insert_one(&job).await.map_err(store_err)?;
        Ok(job)
    }

    async fn find_one(&self, id: &str) -> Result<Option<Job>, RepoError> {
        self.jobs
            .find_one(doc! { "id": id })
            .await
            .map_err(store_err)
    }

    async fn update(&self, id: &str, patch: JobPatch, now: DateTime<Utc>) -> Result<Job, RepoError> {
        let set = patch_to_set_doc(&patch, now);
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.jobs
            .find_one_and_update(doc! { "id": id }, doc! { "$set": set })
            .with_options(options)
            .await
            .map_err(store_err)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    async fn find(&self, filter: Option<JobState>) -> Result<Vec<Job>, RepoError> {
        let query = match filter {
            Some(state) => doc! { "state": state.to_string() },
            None => doc! {},
        };
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        let cursor = self.jobs.find(query).with_options(options).await.map_err(store_err)?;
        cursor.try_collect().await.map_err(store_err)
    }

    async fn count(&self, filter: Option<JobState>) -> Result<u64, RepoError> {
        let query = match filter {
            Some(state) => doc! { "state": state.to_string() },
            None => doc! {},
        };
        self.jobs.count_documents(query).await.map_err(store_err)
    }

    async fn claim_next_pending(&self, worker_id: u32, now: DateTime<Utc>) -> Result<Option<Job>, RepoError> {
        let filter = doc! { "state": JobState::Pending.to_string() };
        let update = doc! {
            "$set": {
                "state": JobState::Processing.to_string(),
                "worker_assigned": worker_id as i64,
                "updated_at": to_rfc3339_z(now),
            }
        };
        // created_at is stored as a fixed-width RFC-3339 string, so
        // lexical sort is chronological sort.
        let options = FindOneAndUpdateOptions::builder()
            .sort(doc! { "created_at": 1 })
            .return_document(ReturnDocument::After)
            .build();
        self.jobs
            .find_one_and_update(filter, update)
            .with_options(options)
            .await
            .map_err(store_err)
    }

    async fn reset_processing(
        &self,
        worker_id: Option<u32>,
        target: JobState,
        now: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        let mut filter = doc! { "state": JobState::Processing.to_string() };
        if let Some(id) = worker_id {
            filter.insert("worker_assigned", id as i64);
        }
        let update = doc! {
            "$set": {
                "state": target.to_string(),
                "updated_at": to_rfc3339_z(now),
            }
        };
        let result = self.jobs.update_many(filter, update).await.map_err(store_err)?;
        Ok(result.modified_count)
    }

    async fn move_to_dlq(&self, mut job: Job) -> Result<(), RepoError> {
        job.state = JobState::Dead;
        if self.dlq_find(&job.id).await?.is_none() {
            self.dlq.insert_one(&job).await.map_err(store_err)?;
        }
        self.jobs.delete_one(doc! { "id": &job.id }).await.map_err(store_err)?;
        Ok(())
    }

    async fn dlq_list(&self) -> Result<Vec<DlqEntry>, RepoError> {
        let cursor = self.dlq.find(doc! {}).await.map_err(store_err)?;
        let jobs: Vec<Job> = cursor.try_collect().await.map_err(store_err)?;
        Ok(jobs.iter().map(DlqEntry::from).collect())
    }

    async fn dlq_find(&self, id: &str) -> Result<Option<Job>, RepoError> {
        self.dlq.find_one(doc! { "id": id }).await.map_err(store_err)
    }

    async fn dlq_delete(&self, id: &str) -> Result<(), RepoError> {
        self.dlq.delete_one(doc! { "id": id }).await.map_err(store_err)?;
        Ok(())
    }

    async fn dlq_retry(&self, id: &str, now: DateTime<Utc>) -> Result<Job, RepoError> {
        let mut job = self
            .dlq_find(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        job.state = JobState::Pending;
        job.attempts = 0;
        job.updated_at = now;
        self.jobs.insert_one(&job).await.map_err(store_err)?;
        self.dlq.delete_one(doc! { "id": id }).await.map_err(store_err)?;
        Ok(job)
    }

    async fn bulk_set_max_retries(&self, max_retries: u32, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let update = doc! {
            "$set": {
                "max_retries": max_retries as i64,
                "updated_at": to_rfc3339_z(now),
            }
        };
        let jobs_result = self
            .jobs
            .update_many(doc! {}, update.clone())
            .await
            .map_err(store_err)?;
        let dlq_result = self.dlq.update_many(doc! {}, update).await.map_err(store_err)?;
        Ok(jobs_result.modified_count + dlq_result.modified_count)
    }
}
