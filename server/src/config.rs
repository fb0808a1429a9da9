use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Deployment-time configuration loaded from environment variables.
///
/// Distinct from [`crate::config_registry::ConfigRegistry`], which holds
/// the runtime-mutable tunables (`max_retries`, `base_delay`) and is
/// mutated over HTTP, not the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub mongo_uri: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            mongo_uri: env::var("MONGO_URI").ok(),
        })
    }
}
