//! The `Engine` spec §9 calls for in place of the original's
//! process-wide globals: one value, created once at server start, owning
//! the repository, the config registry, and the worker pool, injected into
//! the HTTP layer as shared state.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config_registry::{ConfigError, ConfigRegistry, ConfigValue};
use crate::pool::WorkerPool;
use crate::repository::JobRepository;

pub struct Engine {
    pub repo: Arc<dyn JobRepository>,
    pub config: Arc<ConfigRegistry>,
    pub pool: Arc<WorkerPool>,
    pub clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(repo: Arc<dyn JobRepository>, clock: Arc<dyn Clock>) -> Arc<Self> {
        let config = Arc::new(ConfigRegistry::default());
        let pool = Arc::new(WorkerPool::new(repo.clone(), config.clone(), clock.clone()));
        Arc::new(Self {
            repo,
            config,
            pool,
            clock,
        })
    }

    /// Set a config key, propagating `max_retries` to every existing job
    /// (spec §4.3).
    pub async fn set_config(&self, key: &str, value: &serde_json::Value) -> Result<ConfigValue, ConfigError> {
        let stored = self.config.set(key, value)?;
        if key == "max_retries" {
            if let Some(v) = stored.as_u32() {
                if let Err(e) = self.repo.bulk_set_max_retries(v, self.clock.now()).await {
                    tracing::error!(error = %e, "failed to propagate max_retries to existing jobs");
                }
            }
        }
        Ok(stored)
    }
}
