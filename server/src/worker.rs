//! C4: a single claim → execute → settle loop, spec §4.4.
//!
//! Grounded on the corpus's `JobWorker` (`kernel/jobs/worker.rs`) for the
//! `CancellationToken`-driven shutdown shape, and on
//! `examples/original_source/src/worker.py` for the retry/backoff/DLQ
//! arithmetic this loop reproduces.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config_registry::ConfigRegistry;
use crate::exec::{run_command, ExecOutcome};
use crate::job::{Job, JobPatch, JobState};
use crate::repository::JobRepository;

const IDLE_POLL: Duration = Duration::from_secs(1);
const MAX_BACKOFF_SECS: f64 = 60.0;

pub struct Worker {
    pub id: u32,
    repo: Arc<dyn JobRepository>,
    config: Arc<ConfigRegistry>,
    clock: Arc<dyn Clock>,
}

impl Worker {
    pub fn new(id: u32, repo: Arc<dyn JobRepository>, config: Arc<ConfigRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { id, repo, config, clock }
    }

    /// Runs until `stop` is cancelled. Returns once the current job (if
    /// any) has been abandoned or settled at the next suspension point —
    /// never mid-subprocess.
    pub async fn run(&self, stop: CancellationToken) {
        loop {
            let claimed = tokio::select! {
                _ = stop.cancelled() => break,
                claimed = self.claim_or_wait(&stop) => claimed,
            };
            let Some(job) = claimed else {
                // stop fired while waiting to claim
                break;
            };
            self.drive_to_settlement(job, &stop).await;
        }
    }

    /// Polls `claim_next_pending` until a job shows up, sleeping
    /// [`IDLE_POLL`] between attempts. The caller races this against the
    /// stop signal, so an idle wait is always interruptible.
    async fn claim_or_wait(&self, stop: &CancellationToken) -> Option<Job> {
        loop {
            match self.repo.claim_next_pending(self.id, self.clock.now()).await {
                Ok(Some(job)) => return Some(job),
                Ok(None) => tokio::time::sleep(IDLE_POLL).await,
                Err(e) => {
                    warn!(worker_id = self.id, error = %e, "claim failed, retrying");
                    tokio::time::sleep(IDLE_POLL).await;
                }
            }
            if stop.is_cancelled() {
                return None;
            }
        }
    }

    /// Runs `job` to completion: success, dead-letter, or abandonment at a
    /// backoff-sleep boundary if `stop` fires mid-retry.
    async fn drive_to_settlement(&self, mut job: Job, stop: &CancellationToken) {
        loop {
            let outcome = run_command(&job.command, job.timeout).await;
            match outcome {
                ExecOutcome::Success => {
                    self.settle_completed(&job).await;
                    info!(worker_id = self.id, job_id = %job.id, "job completed");
                    return;
                }
                ExecOutcome::Failure(reason) => {
                    let attempts = job.attempts + 1;
                    if attempts <= job.max_retries {
                        self.persist_attempt(&job.id, attempts).await;
                        job.attempts = attempts;
                        warn!(worker_id = self.id, job_id = %job.id, attempts, %reason, "attempt failed, retrying");

                        if stop.is_cancelled() {
                            // Leave the job in `processing`; the pool's
                            // graceful reset will return it to `pending`.
                            return;
                        }
                        let delay = backoff_delay(self.config.base_delay(), attempts);
                        tokio::select! {
                            _ = stop.cancelled() => return,
                            _ = tokio::time::sleep(Duration::from_secs_f64(delay)) => {}
                        }
                    } else {
                        job.attempts = attempts;
                        info!(worker_id = self.id, job_id = %job.id, attempts, "job exhausted retries, dead-lettering");
                        self.dead_letter(job).await;
                        return;
                    }
                }
            }
        }
    }

    async fn settle_completed(&self, job: &Job) {
        let patch = JobPatch {
            state: Some(JobState::Completed),
            ..Default::default()
        };
        if let Err(e) = self.repo.update(&job.id, patch, self.clock.now()).await {
            warn!(worker_id = self.id, job_id = %job.id, error = %e, "failed to settle completed job");
        }
    }

    async fn persist_attempt(&self, job_id: &str, attempts: u32) {
        let patch = JobPatch {
            attempts: Some(attempts),
            ..Default::default()
        };
        if let Err(e) = self.repo.update(job_id, patch, self.clock.now()).await {
            warn!(worker_id = self.id, job_id, error = %e, "failed to persist attempt count");
        }
    }

    async fn dead_letter(&self, job: Job) {
        if let Err(e) = self.repo.move_to_dlq(job.clone()).await {
            warn!(worker_id = self.id, job_id = %job.id, error = %e, "failed to move job to dlq");
        }
    }
}

/// `delay = min(d0^attempts + U(0,1), 60)`, `d0 = max(base_delay, 1)`
/// (spec §4.4).
pub fn backoff_delay(base_delay: f64, attempts: u32) -> f64 {
    let d0 = base_delay.max(1.0);
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    (d0.powi(attempts as i32) + jitter).min(MAX_BACKOFF_SECS)
}
