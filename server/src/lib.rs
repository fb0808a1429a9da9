//! Shell-command job queue engine: an atomic claim/execute/settle pipeline,
//! a worker pool with cooperative stop and crash reset, and the HTTP API
//! that fronts it.

pub mod clock;
pub mod config;
pub mod config_registry;
pub mod engine;
pub mod exec;
pub mod http;
pub mod job;
pub mod pool;
pub mod repository;
pub mod time_format;
pub mod worker;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use config_registry::ConfigRegistry;
pub use engine::Engine;
pub use job::{Job, JobPatch, JobState};
pub use repository::JobRepository;
