use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;

use super::handlers;

pub fn build_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/list", get(handlers::list_jobs))
        .route("/enqueue", post(handlers::enqueue))
        .route("/update", put(handlers::update))
        .route("/worker/start", get(handlers::worker_start))
        .route("/worker/stop", get(handlers::worker_stop))
        .route("/status", get(handlers::status))
        .route("/dlq/list", get(handlers::dlq_list))
        .route("/dlq/retry", post(handlers::dlq_retry))
        .route("/config/set", post(handlers::config_set))
        .route("/config/get", get(handlers::config_get))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(engine)
}
