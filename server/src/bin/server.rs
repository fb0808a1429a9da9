use std::sync::Arc;

use anyhow::{Context, Result};
use jobqueue_server::repository::{InMemoryJobRepository, MongoJobRepository};
use jobqueue_server::{Config, Engine, JobRepository, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jobqueue_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let repo: Arc<dyn JobRepository> = match &config.mongo_uri {
        Some(uri) => {
            tracing::info!("connecting to MongoDB");
            Arc::new(
                MongoJobRepository::connect(uri)
                    .await
                    .context("failed to connect to MongoDB")?,
            )
        }
        None => {
            tracing::warn!("MONGO_URI not set, falling back to an in-memory job repository");
            Arc::new(InMemoryJobRepository::new())
        }
    };

    let engine = Engine::new(repo, Arc::new(SystemClock));
    let app = jobqueue_server::http::build_router(engine.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "starting job queue server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(engine))
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal(engine: Arc<Engine>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received, stopping worker pool");
    if let Err(e) = engine.pool.stop().await {
        tracing::error!(error = %e, "failed to stop worker pool during shutdown");
    }
}
