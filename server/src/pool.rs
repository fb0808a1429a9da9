//! C5: spawns workers, tracks their lifetimes, and reconciles orphaned
//! `processing` rows on both the graceful-stop and crash paths
//! (spec §4.5).

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::clock::Clock;
use crate::config_registry::ConfigRegistry;
use crate::job::JobState;
use crate::repository::JobRepository;
use crate::worker::Worker;

const MAX_STAGGER_MS: u64 = 200;
// Mirrors the original's `thread.join(timeout=3)`.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is already running")]
    AlreadyRunning,
    #[error("pool error: {0}")]
    Store(#[from] crate::repository::RepoError),
}

pub struct WorkerPool {
    repo: Arc<dyn JobRepository>,
    config: Arc<ConfigRegistry>,
    clock: Arc<dyn Clock>,
    state: tokio::sync::Mutex<Option<RunningPool>>,
}

struct RunningPool {
    stop: CancellationToken,
    // Each handle resolves once that worker has exited cleanly *and*,
    // if it panicked, after its own rows have been crash-reset to
    // `failed` — see `spawn_supervised_worker`.
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(repo: Arc<dyn JobRepository>, config: Arc<ConfigRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            config,
            clock,
            state: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Spawn `n` workers with ids `1..=n`. Returns once they're running;
    /// does not wait on their completion.
    pub async fn start(&self, n: u32) -> Result<(), PoolError> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(PoolError::AlreadyRunning);
        }

        let stop = CancellationToken::new();
        let mut handles = Vec::with_capacity(n as usize);
        for worker_id in 1..=n {
            handles.push(self.spawn_supervised_worker(worker_id, stop.clone()));
        }

        info!(count = n, "worker pool started");
        *state = Some(RunningPool { stop, handles });
        Ok(())
    }

    fn spawn_supervised_worker(&self, worker_id: u32, stop: CancellationToken) -> JoinHandle<()> {
        let repo = self.repo.clone();
        let config = self.config.clone();
        let clock = self.clock.clone();

        tokio::spawn(async move {
            let stagger = rand::thread_rng().gen_range(0..=MAX_STAGGER_MS);
            tokio::time::sleep(Duration::from_millis(stagger)).await;

            let worker = Worker::new(worker_id, repo.clone(), config, clock.clone());
            let inner = tokio::spawn(async move { worker.run(stop.clone()).await });

            if let Err(join_err) = inner.await {
                error!(worker_id, error = %join_err, "worker task panicked; resetting its rows to failed");
                if let Err(e) = repo.reset_processing(Some(worker_id), JobState::Failed, clock.now()).await {
                    error!(worker_id, error = %e, "crash reset failed");
                }
            }
        })
    }

    /// Raise the stop signal, wait (bounded) for every worker to exit,
    /// then perform the graceful reset: every row still `processing`
    /// becomes `pending`.
    pub async fn stop(&self) -> Result<(), PoolError> {
        let mut state = self.state.lock().await;
        let Some(running) = state.take() else {
            return Ok(());
        };
        running.stop.cancel();

        let wait = async {
            for handle in running.handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_WAIT, wait).await.is_err() {
            error!("worker pool did not shut down within the bounded wait");
        }

        let reset = self
            .repo
            .reset_processing(None, JobState::Pending, self.clock.now())
            .await?;
        info!(reset, "worker pool stopped, processing rows returned to pending");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::job::Job;
    use crate::repository::InMemoryJobRepository;
    use chrono::Utc;

    fn pool() -> (Arc<dyn JobRepository>, WorkerPool) {
        let repo: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
        let config = Arc::new(ConfigRegistry::default());
        let clock = Arc::new(SystemClock);
        let pool = WorkerPool::new(repo.clone(), config, clock);
        (repo, pool)
    }

    #[tokio::test]
    async fn start_twice_without_stop_is_rejected() {
        let (_repo, pool) = pool();
        pool.start(1).await.unwrap();
        assert!(matches!(pool.start(1).await, Err(PoolError::AlreadyRunning)));
        pool.stop().await.unwrap();
    }

    #[tokio::test]
    async fn enqueue_run_and_complete_within_the_pool() {
        let (repo, pool) = pool();
        let now = Utc::now();
        repo.insert(Job::new_pending("a".into(), "exit 0".into(), 0, 1, 5, now, now, 0))
            .await
            .unwrap();

        pool.start(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        pool.stop().await.unwrap();

        let job = repo.find_one("a").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
    }

    #[tokio::test]
    async fn graceful_stop_returns_in_flight_job_to_pending() {
        let (repo, pool) = pool();
        let now = Utc::now();
        repo.insert(Job::new_pending("d".into(), "sleep 30".into(), 0, 0, 60, now, now, 0))
            .await
            .unwrap();

        pool.start(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        pool.stop().await.unwrap();

        let job = repo.find_one("d").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
    }

    #[tokio::test]
    async fn stop_without_a_prior_start_is_a_no_op() {
        let (_repo, pool) = pool();
        pool.stop().await.unwrap();
    }
}
