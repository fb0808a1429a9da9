//! End-to-end coverage of the HTTP surface (spec §4.6, §8) driven directly
//! against the axum `Router` with `tower::ServiceExt::oneshot`, without
//! binding a socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use jobqueue_server::repository::InMemoryJobRepository;
use jobqueue_server::{Engine, JobRepository, SystemClock};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> axum::Router {
    let repo: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let engine = Engine::new(repo, Arc::new(SystemClock));
    jobqueue_server::http::build_router(engine)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn enqueue_then_list_round_trips_a_job() {
    let app = app();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/enqueue",
            json!({"id": "a", "command": "exit 0"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(Request::builder().uri("/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let jobs = body_json(res).await;
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["id"], "a");
    assert_eq!(jobs[0]["state"], "pending");
}

#[tokio::test]
async fn enqueue_duplicate_id_is_rejected() {
    let app = app();
    let body = json!({"id": "a", "command": "exit 0"});

    let res = app.clone().oneshot(json_request("POST", "/enqueue", body.clone())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.oneshot(json_request("POST", "/enqueue", body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn enqueue_without_command_is_rejected() {
    let app = app();
    let res = app
        .oneshot(json_request("POST", "/enqueue", json!({"id": "a"})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn enqueue_ignores_client_supplied_state_and_max_retries() {
    let app = app();
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/enqueue",
            json!({"id": "a", "command": "exit 0", "state": "processing", "max_retries": 99}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(Request::builder().uri("/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let jobs = body_json(res).await;
    assert_eq!(jobs[0]["state"], "pending");
    assert_eq!(jobs[0]["max_retries"], 3);
}

#[tokio::test]
async fn update_missing_job_is_404() {
    let app = app();
    let res = app
        .oneshot(json_request("PUT", "/update", json!({"id": "missing", "timeout": 5})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_with_no_effective_changes_is_400() {
    let app = app();
    app.clone()
        .oneshot(json_request("POST", "/enqueue", json!({"id": "a", "command": "exit 0"})))
        .await
        .unwrap();

    let res = app
        .oneshot(json_request("PUT", "/update", json!({"id": "a"})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_changing_a_field_succeeds() {
    let app = app();
    app.clone()
        .oneshot(json_request("POST", "/enqueue", json!({"id": "a", "command": "exit 0"})))
        .await
        .unwrap();

    let res = app
        .oneshot(json_request("PUT", "/update", json!({"id": "a", "timeout": 99})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_reports_idle_with_no_jobs() {
    let app = app();
    let res = app.oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["system_status"], "idle");
    assert_eq!(body["summary"]["total_jobs"], 0);
}

#[tokio::test]
async fn status_reports_healthy_with_a_pending_job() {
    let app = app();
    app.clone()
        .oneshot(json_request("POST", "/enqueue", json!({"id": "a", "command": "exit 0"})))
        .await
        .unwrap();

    let res = app.oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap()).await.unwrap();
    let body = body_json(res).await;
    assert_eq!(body["system_status"], "healthy");
    assert_eq!(body["summary"]["pending"], 1);
}

#[tokio::test]
async fn dlq_list_is_empty_with_a_friendly_status() {
    let app = app();
    let res = app.oneshot(Request::builder().uri("/dlq/list").body(Body::empty()).unwrap()).await.unwrap();
    let body = body_json(res).await;
    assert_eq!(body["status"], "DLQ is empty");
    assert_eq!(body["jobs"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn dlq_retry_missing_job_is_404() {
    let app = app();
    let res = app
        .oneshot(Request::builder().uri("/dlq/retry?job_id=missing").method("POST").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn config_get_unknown_key_is_400() {
    let app = app();
    let res = app
        .oneshot(Request::builder().uri("/config/get?key=bogus").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn config_set_then_get_round_trips() {
    let app = app();
    let res = app
        .clone()
        .oneshot(json_request("POST", "/config/set", json!({"key": "max_retries", "value": 7})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(Request::builder().uri("/config/get?key=max_retries").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["value"], 7);
}

#[tokio::test]
async fn config_propagation_scenario_updates_existing_jobs() {
    // Scenario 5: two pending jobs adopt a new max_retries after config/set.
    let app = app();
    for id in ["e", "f"] {
        app.clone()
            .oneshot(json_request("POST", "/enqueue", json!({"id": id, "command": "exit 0"})))
            .await
            .unwrap();
    }

    app.clone()
        .oneshot(json_request("POST", "/config/set", json!({"key": "max_retries", "value": 7})))
        .await
        .unwrap();

    let res = app.oneshot(Request::builder().uri("/list").body(Body::empty()).unwrap()).await.unwrap();
    let jobs = body_json(res).await;
    for job in jobs.as_array().unwrap() {
        assert_eq!(job["max_retries"], 7);
    }
}

#[tokio::test]
async fn worker_start_with_zero_workers_is_rejected() {
    let app = app();
    let res = app
        .oneshot(Request::builder().uri("/worker/start?num_workers=0").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scenario_enqueue_run_and_complete() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/enqueue",
            json!({"id": "a", "command": "exit 0", "max_retries": 1}),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(Request::builder().uri("/worker/start?num_workers=1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    app.clone().oneshot(Request::builder().uri("/worker/stop").body(Body::empty()).unwrap()).await.unwrap();

    let res = app.oneshot(Request::builder().uri("/list?state=completed").body(Body::empty()).unwrap()).await.unwrap();
    let jobs = body_json(res).await;
    assert_eq!(jobs[0]["id"], "a");
    assert_eq!(jobs[0]["attempts"], 0);
}

#[tokio::test]
async fn scenario_dlq_round_trip() {
    // Scenario 2 + 6: a deterministically-failing job dead-letters, then
    // a single retry re-enqueues it and a second retry 404s (P6).
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/config/set",
            json!({"key": "base_delay", "value": 1}),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/enqueue",
            json!({"id": "b", "command": "exit 1", "max_retries": 1, "timeout": 5}),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(Request::builder().uri("/worker/start?num_workers=1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(4)).await;
    app.clone().oneshot(Request::builder().uri("/worker/stop").body(Body::empty()).unwrap()).await.unwrap();

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/dlq/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let dlq = body_json(res).await;
    assert_eq!(dlq["jobs"][0]["id"], "b");
    assert_eq!(dlq["jobs"][0]["attempts"], 2);

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/dlq/retry?job_id=b").method("POST").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/dlq/retry?job_id=b").method("POST").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.oneshot(Request::builder().uri("/list?state=pending").body(Body::empty()).unwrap()).await.unwrap();
    let jobs = body_json(res).await;
    assert_eq!(jobs[0]["id"], "b");
    assert_eq!(jobs[0]["attempts"], 0);
}
