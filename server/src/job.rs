//! The Job record (spec §3.1) and the state machine it moves through
//! (spec §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default per-execution wall-clock limit, in seconds, when a job doesn't
/// specify one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Dead => "dead",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "dead" => Ok(JobState::Dead),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub state: JobState,
    pub attempts: u32,
    pub max_retries: u32,
    pub timeout: u64,
    #[serde(with = "crate::time_format::required")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_format::required")]
    pub updated_at: DateTime<Utc>,
    pub worker_assigned: u32,
}

impl Job {
    /// Build a freshly-enqueued job. `state` is always `pending` and
    /// `max_retries` is always sourced from the caller's config snapshot —
    /// the client never controls either (spec §9, Open Question 2).
    #[allow(clippy::too_many_arguments)]
    pub fn new_pending(
        id: String,
        command: String,
        attempts: u32,
        max_retries: u32,
        timeout: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        worker_assigned: u32,
    ) -> Self {
        Self {
            id,
            command,
            state: JobState::Pending,
            attempts,
            max_retries,
            timeout,
            created_at,
            updated_at,
            worker_assigned,
        }
    }
}

/// A partial update to a `Job`. Every field absent (`None`) is left
/// untouched; `updated_at` is always refreshed by whoever applies the
/// patch, so it isn't part of this struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub command: Option<String>,
    pub state: Option<JobState>,
    pub attempts: Option<u32>,
    pub max_retries: Option<u32>,
    pub timeout: Option<u64>,
    pub worker_assigned: Option<u32>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.command.is_none()
            && self.state.is_none()
            && self.attempts.is_none()
            && self.max_retries.is_none()
            && self.timeout.is_none()
            && self.worker_assigned.is_none()
    }

    /// True when every field this patch sets already matches `job` — the
    /// store-agnostic "no-op update" check (SPEC_FULL.md §G).
    pub fn is_noop_against(&self, job: &Job) -> bool {
        if self.is_empty() {
            return true;
        }
        self.command.as_deref().map_or(true, |v| v == job.command)
            && self.state.map_or(true, |v| v == job.state)
            && self.attempts.map_or(true, |v| v == job.attempts)
            && self.max_retries.map_or(true, |v| v == job.max_retries)
            && self.timeout.map_or(true, |v| v == job.timeout)
            && self.worker_assigned.map_or(true, |v| v == job.worker_assigned)
    }

    pub fn apply_to(&self, job: &mut Job, updated_at: DateTime<Utc>) {
        if let Some(v) = self.command.clone() {
            job.command = v;
        }
        if let Some(v) = self.state {
            job.state = v;
        }
        if let Some(v) = self.attempts {
            job.attempts = v;
        }
        if let Some(v) = self.max_retries {
            job.max_retries = v;
        }
        if let Some(v) = self.timeout {
            job.timeout = v;
        }
        if let Some(v) = self.worker_assigned {
            job.worker_assigned = v;
        }
        job.updated_at = updated_at;
    }
}
