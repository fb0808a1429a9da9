//! C6: thin translation from HTTP requests to repository/pool/config
//! operations (spec §4.6).

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::DateTime;

use crate::engine::Engine;
use crate::job::{Job, JobState};

use super::dto::*;
use super::error::AppError;

pub async fn list_jobs(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<JobView>>, AppError> {
    let filter = parse_state_filter(query.state.as_deref())?;
    let jobs = engine.repo.find(filter).await?;
    Ok(Json(jobs.into_iter().map(JobView::from).collect()))
}

pub async fn enqueue(
    State(engine): State<Arc<Engine>>,
    Json(body): Json<JobBody>,
) -> Result<Json<EnqueueResponse>, AppError> {
    if body.command.is_none() {
        return Err(AppError::Validation("command is required".to_string()));
    }
    let now = engine.clock.now();
    let parse_ts = |raw: &Option<String>, fallback: DateTime<chrono::Utc>| -> Result<DateTime<chrono::Utc>, AppError> {
        match raw {
            Some(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|_| AppError::Validation(format!("invalid timestamp: {s}"))),
            None => Ok(fallback),
        }
    };

    // Open Question 2: enqueue always produces `pending`, and
    // `max_retries` always comes from the config registry — neither is
    // client-controlled, regardless of what the body sets.
    let job = Job::new_pending(
        body.id,
        body.command.expect("checked above"),
        body.attempts.unwrap_or(0),
        engine.config.max_retries(),
        body.timeout.unwrap_or(crate::job::DEFAULT_TIMEOUT_SECS),
        parse_ts(&body.created_at, now)?,
        parse_ts(&body.updated_at, now)?,
        body.worker_assigned.unwrap_or(0),
    );

    let inserted = engine.repo.insert(job).await?;
    Ok(Json(EnqueueResponse {
        status: "Insertion Successful",
        inserted_id: inserted.id,
    }))
}

pub async fn update(
    State(engine): State<Arc<Engine>>,
    Json(body): Json<JobBody>,
) -> Result<Json<UpdateResponse>, AppError> {
    let existing = engine
        .repo
        .find_one(&body.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Updation Unsuccessful - Job doesn't exist".to_string()))?;

    let patch = body
        .to_patch()
        .map_err(|e| AppError::Validation(format!("invalid state: {e}")))?;

    if patch.is_noop_against(&existing) {
        return Err(AppError::NoChange(
            "Updation Unsuccessful - No changes were made".to_string(),
        ));
    }

    engine.repo.update(&body.id, patch, engine.clock.now()).await?;
    Ok(Json(UpdateResponse {
        status_code: 200,
        details: format!("Updation Successful for job {}", body.id),
    }))
}

pub async fn worker_start(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<WorkerStartQuery>,
) -> Result<Json<SimpleResponse>, AppError> {
    if query.num_workers == 0 {
        return Err(AppError::Validation("num_workers must be >= 1".to_string()));
    }
    engine.pool.start(query.num_workers).await?;
    Ok(Json(SimpleResponse {
        status_code: 200,
        details: format!("Started {} worker(s) successfully!", query.num_workers),
    }))
}

pub async fn worker_stop(State(engine): State<Arc<Engine>>) -> Result<Json<SimpleResponse>, AppError> {
    engine.pool.stop().await?;
    Ok(Json(SimpleResponse {
        status_code: 200,
        details: "Workers Stopped Gracefully".to_string(),
    }))
}

pub async fn status(State(engine): State<Arc<Engine>>) -> Result<Json<StatusResponse>, AppError> {
    let total = engine.repo.count(None).await?;
    let pending = engine.repo.count(Some(JobState::Pending)).await?;
    let processing = engine.repo.count(Some(JobState::Processing)).await?;
    let completed = engine.repo.count(Some(JobState::Completed)).await?;
    let failed = engine.repo.count(Some(JobState::Failed)).await?;
    // dead jobs live only in the DLQ (spec §9, Open Question 3).
    let dead = engine.repo.dlq_list().await?.len() as u64;

    let processing_jobs = engine.repo.find(Some(JobState::Processing)).await?;
    let active_workers: HashSet<u32> = processing_jobs
        .iter()
        .map(|j| j.worker_assigned)
        .filter(|id| *id != 0)
        .collect();

    let system_status = if processing > 0 || pending > 0 { "healthy" } else { "idle" };

    Ok(Json(StatusResponse {
        timestamp: crate::time_format::to_rfc3339_z(engine.clock.now()),
        summary: StatusSummary {
            total_jobs: total,
            pending,
            processing,
            completed,
            failed,
            dead,
        },
        active_workers: active_workers.len(),
        system_status,
    }))
}

pub async fn dlq_list(State(engine): State<Arc<Engine>>) -> Result<Json<DlqListResponse>, AppError> {
    let entries = engine.repo.dlq_list().await?;
    let status = if entries.is_empty() { "DLQ is empty" } else { "success" };
    Ok(Json(DlqListResponse {
        status,
        jobs: entries.into_iter().map(DlqEntryView::from).collect(),
    }))
}

pub async fn dlq_retry(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<DlqRetryQuery>,
) -> Result<Json<SimpleResponse>, AppError> {
    let now = engine.clock.now();
    engine
        .repo
        .dlq_retry(&query.job_id, now)
        .await
        .map_err(|e| match e {
            crate::repository::RepoError::NotFound(id) => {
                AppError::NotFound(format!("Job {id} not found in DLQ"))
            }
            other => AppError::from(other),
        })?;

    Ok(Json(SimpleResponse {
        status_code: 200,
        details: format!("Job {} retried successfully", query.job_id),
    }))
}

pub async fn config_set(
    State(engine): State<Arc<Engine>>,
    Json(body): Json<ConfigSetBody>,
) -> Result<Json<ConfigResponse>, AppError> {
    let value = engine.set_config(&body.key, &body.value).await?;
    Ok(Json(ConfigResponse {
        status: "success",
        key: body.key,
        value: config_value_to_json(value),
    }))
}

pub async fn config_get(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<ConfigGetQuery>,
) -> Result<Json<ConfigResponse>, AppError> {
    let value = engine.config.get(&query.key)?;
    Ok(Json(ConfigResponse {
        status: "success",
        key: query.key,
        value: config_value_to_json(value),
    }))
}

fn config_value_to_json(value: crate::config_registry::ConfigValue) -> serde_json::Value {
    match value {
        crate::config_registry::ConfigValue::Int(v) => serde_json::json!(v),
        crate::config_registry::ConfigValue::Float(v) => serde_json::json!(v),
    }
}

fn parse_state_filter(raw: Option<&str>) -> Result<Option<JobState>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<JobState>()
            .map(Some)
            .map_err(AppError::Validation),
    }
}
