//! Wire types for the HTTP surface (spec §6.2).

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobPatch, JobState};

/// The `enqueue`/`update` request body. Every field but `id` is optional;
/// `enqueue` and `update` interpret absence differently (SPEC_FULL.md §G).
#[derive(Debug, Deserialize)]
pub struct JobBody {
    pub id: String,
    pub command: Option<String>,
    pub state: Option<String>,
    pub attempts: Option<u32>,
    pub max_retries: Option<u32>,
    pub timeout: Option<u64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub worker_assigned: Option<u32>,
}

impl JobBody {
    pub fn to_patch(&self) -> Result<JobPatch, String> {
        let state = self
            .state
            .as_deref()
            .map(|s| s.parse::<JobState>())
            .transpose()?;
        Ok(JobPatch {
            command: self.command.clone(),
            state,
            attempts: self.attempts,
            max_retries: self.max_retries,
            timeout: self.timeout,
            worker_assigned: self.worker_assigned,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct JobView {
    pub id: String,
    pub command: String,
    pub state: String,
    pub attempts: u32,
    pub max_retries: u32,
    pub timeout: u64,
    pub created_at: String,
    pub updated_at: String,
    pub worker_assigned: u32,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            command: job.command,
            state: job.state.to_string(),
            attempts: job.attempts,
            max_retries: job.max_retries,
            timeout: job.timeout,
            created_at: crate::time_format::to_rfc3339_z(job.created_at),
            updated_at: crate::time_format::to_rfc3339_z(job.updated_at),
            worker_assigned: job.worker_assigned,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerStartQuery {
    pub num_workers: u32,
}

#[derive(Debug, Deserialize)]
pub struct DlqRetryQuery {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub status: &'static str,
    pub inserted_id: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub status_code: u16,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_jobs: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub dead: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub timestamp: String,
    pub summary: StatusSummary,
    pub active_workers: usize,
    pub system_status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DlqEntryView {
    pub id: String,
    pub command: String,
    pub attempts: u32,
}

impl From<crate::repository::DlqEntry> for DlqEntryView {
    fn from(e: crate::repository::DlqEntry) -> Self {
        Self {
            id: e.id,
            command: e.command,
            attempts: e.attempts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DlqListResponse {
    pub status: &'static str,
    pub jobs: Vec<DlqEntryView>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigSetBody {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ConfigGetQuery {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub status: &'static str,
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SimpleResponse {
    pub status_code: u16,
    pub details: String,
}
