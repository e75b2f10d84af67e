//! Integration-style tests exercising the full Axum router against an
//! `AppState` built from hand-rolled test doubles, in the style of
//! `dispatch-application::orchestrator`'s scripted fakes - `mockall`
//! stays available for tests that need call-count expectations, but a
//! plain struct is clearer for the scripted outcomes these routes need.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use dispatch_domain::entities::{ExecutionResult, ExecutionStatus, JobCreationRequest, JobCreationResult, JobOutcome, ResourceLimits};
use dispatch_domain::error::Result;
use dispatch_domain::ports::{BlobStore, ClusterJobManager, EventPublisher, LlmProvider, SandboxExecutor};
use dispatch_infrastructure::{EngineConfig, FilesystemBlobStore, SeaOrmHistoryRepository};
use dispatch_server::{build_router, AppState};
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower::ServiceExt;

struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    async fn generate(&self, _task: &str) -> Result<String> {
        Ok("print('hello')".to_string())
    }

    async fn correct(&self, _previous_code: &str, _feedback: &str) -> Result<String> {
        Ok("print('hello')".to_string())
    }
}

struct StubSandbox;

#[async_trait]
impl SandboxExecutor for StubSandbox {
    async fn execute(&self, _code: &str, _request_id: &str, _timeout_seconds: u64) -> Result<ExecutionResult> {
        Ok(ExecutionResult {
            request_id: "req".to_string(),
            stdout: "hello\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 5,
            status: ExecutionStatus::Success,
        })
    }
}

struct StubCluster;

#[async_trait]
impl ClusterJobManager for StubCluster {
    async fn create_job(&self, request: &JobCreationRequest) -> Result<JobCreationResult> {
        Ok(JobCreationResult { job_id: format!("heavy-executor-{}", request.request_id), status: "submitted".to_string() })
    }

    async fn monitor_job(&self, _job_id: &str, _timeout_seconds: u64) -> Result<JobOutcome> {
        Ok(JobOutcome::Succeeded)
    }

    async fn delete_job(&self, _job_id: &str) -> Result<bool> {
        Ok(true)
    }
}

struct StubPublisher;

#[async_trait]
impl EventPublisher for StubPublisher {
    async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> Result<()> {
        Ok(())
    }
}

async fn test_state(cluster: Option<Arc<dyn ClusterJobManager>>) -> AppState {
    let blob_dir = tempfile::tempdir().expect("tempdir");
    let blob: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::new(blob_dir.keep()));
    let history = Arc::new(SeaOrmHistoryRepository::connect("sqlite::memory:").await.expect("in-memory sqlite connects"));
    let handle = PrometheusBuilder::new().build_recorder().handle();

    AppState::new(Arc::new(EngineConfig::default()), Arc::new(StubLlm), Arc::new(StubSandbox), cluster, blob, Arc::new(StubPublisher), history, handle)
}

#[tokio::test]
async fn health_reports_healthy_with_no_inflight_work() {
    let app = build_router(test_state(None).await);

    let response = app.oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["activeExecutions"], 0);
}

#[tokio::test]
async fn ready_reports_ready_when_the_history_store_is_reachable() {
    let app = build_router(test_state(None).await);

    let response = app.oneshot(Request::builder().uri("/api/v1/ready").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ready"], true);
}

#[tokio::test]
async fn execute_snippet_runs_through_the_sandbox_and_returns_its_result() {
    let app = build_router(test_state(None).await);

    let body = serde_json::json!({"code": "print('hello')", "timeout": 5});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/execute_snippet")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["exitCode"], 0);
    assert_eq!(json["stdout"], "hello\n");
    assert_eq!(json["status"], "success");
}

#[tokio::test]
async fn create_heavy_job_returns_503_without_a_configured_cluster() {
    let app = build_router(test_state(None).await);

    let body = serde_json::json!({"code": "print('hello')"});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/create_heavy_job")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn create_heavy_job_succeeds_once_a_cluster_is_configured() {
    let cluster: Arc<dyn ClusterJobManager> = Arc::new(StubCluster);
    let app = build_router(test_state(Some(cluster)).await);

    let body = serde_json::json!({"code": "print('hello')", "resourceLimits": ResourceLimits::default()});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/create_heavy_job")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["jobId"].as_str().unwrap().starts_with("heavy-executor-"));
}

#[tokio::test]
async fn job_history_list_is_empty_for_a_fresh_database() {
    let app = build_router(test_state(None).await);

    let response = app.oneshot(Request::builder().uri("/api/v1/job_history").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 0);
    assert!(json["records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn job_history_get_returns_404_for_an_unknown_request_id() {
    let app = build_router(test_state(None).await);

    let response =
        app.oneshot(Request::builder().uri("/api/v1/job_history/does-not-exist").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_exposes_prometheus_text_format() {
    let app = build_router(test_state(None).await);

    let response = app.oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn every_response_carries_a_correlation_id_header() {
    let app = build_router(test_state(None).await);

    let response = app.oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap()).await.unwrap();

    assert!(response.headers().get("x-request-id").is_some());
}
