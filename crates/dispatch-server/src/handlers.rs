//! HTTP handlers for every route in [`crate::routes::build_router`].
//!
//! Grounded on
//! `original_source/src/llm_executor/executor_service/api.py`'s handler
//! bodies: active-execution tracking around the blocking paths, persisting
//! to `job_history` regardless of outcome with persistence failures logged
//! and swallowed rather than failing the request, and the 503-when-
//! uninitialized shape for the heavy-job route.

use crate::dto::{
    CreateHeavyJobRequest, CreateHeavyJobResponse, ErrorResponse, ExecuteSnippetRequest, ExecuteSnippetResponse, HealthResponse,
    JobHistoryListResponse, JobHistoryQuery, JobHistoryResponse, QueryExecutionResult, QueryRequest, QueryResponse, ReadyResponse,
};
use crate::middleware::CorrelationId;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use dispatch_application::OrchestrationStatus;
use dispatch_domain::entities::{ComplexityTag, ExecutionStatus, HistoryQuery, HistoryRecord};
use std::str::FromStr;
use tracing::{error, info, warn};

fn error_body(error: &str, message: impl Into<String>, request_id: Option<String>) -> Json<ErrorResponse> {
    Json(ErrorResponse { error: error.to_string(), message: message.into(), request_id })
}

/// `POST /api/v1/query`: runs the full generate/validate/correct/classify
/// cycle and reports the synthesized program's disposition. The sandbox or
/// cluster dispatch this routes to afterwards runs in the background; the
/// response itself never carries `stdout`/`exitCode` per spec.md §6's
/// schema for this route.
pub async fn query(State(state): State<AppState>, Extension(correlation_id): Extension<CorrelationId>, Json(body): Json<QueryRequest>) -> impl IntoResponse {
    let request_id = correlation_id.0.clone();
    let max_retries = body.max_retries.clamp(1, 10);

    let outcome = match state.orchestrator.execute(&body.query, max_retries).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(request_id, error = %err, "orchestration failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, error_body("Internal server error", err.to_string(), Some(request_id)))
                .into_response();
        }
    };

    let verdict = outcome.verdict.clone().unwrap_or_default();
    let validation_passed = outcome.status == OrchestrationStatus::Routed;
    let validation_errors: Vec<String> = verdict.findings.iter().map(|f| format!("{}: {}", f.rule, f.message)).collect();

    let status = match outcome.status {
        OrchestrationStatus::Routed => "routed",
        OrchestrationStatus::ValidationFailedMaxRetries => "validation_failed_max_retries",
    };

    if validation_passed {
        let timeout = body.timeout.unwrap_or(state.config.execution_timeout_seconds);
        spawn_dispatch(state.clone(), request_id.clone(), outcome.code.clone(), outcome.tag, timeout);
    }

    let response = QueryResponse {
        request_id,
        generated_code: outcome.code,
        execution_result: QueryExecutionResult {
            validation_passed,
            validation_errors,
            validation_warnings: Vec::new(),
            classification: outcome.tag,
        },
        status: status.to_string(),
        classification: outcome.tag,
        validation_attempts: outcome.attempts,
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Dispatches a routed program to the sandbox (lightweight) or cluster
/// (heavy) path and persists the outcome, without blocking the caller of
/// `/api/v1/query`.
pub(crate) fn spawn_dispatch(state: AppState, request_id: String, code: String, tag: Option<ComplexityTag>, timeout: u64) {
    tokio::spawn(async move {
        state.inflight.insert(request_id.clone());

        match tag {
            Some(ComplexityTag::Lightweight) | None => {
                let result = state.retry.execute_with_retry(&code, &request_id, timeout).await;
                persist_history(&state, &request_id, result.status, Some(result.exit_code), result.duration_ms, tag).await;
            }
            Some(ComplexityTag::Heavy) => {
                dispatch_heavy(&state, &request_id, &code, timeout).await;
            }
        }

        state.inflight.remove(&request_id);
    });
}

pub(crate) async fn dispatch_heavy(state: &AppState, request_id: &str, code: &str, timeout: u64) {
    let Some(cluster) = state.cluster.as_ref() else {
        warn!(request_id, "heavy dispatch requested but no cluster job manager is configured");
        persist_history(state, request_id, ExecutionStatus::Error, None, 0, Some(ComplexityTag::Heavy)).await;
        return;
    };

    let mut limits = state.config.resource_limits.clone();
    limits.timeout_seconds = timeout;
    let job_request = dispatch_domain::entities::JobCreationRequest {
        request_id: request_id.to_string(),
        code: code.to_string(),
        resource_limits: limits,
    };

    let created = match cluster.create_job(&job_request).await {
        Ok(created) => created,
        Err(err) => {
            error!(request_id, error = %err, "failed to create heavy job");
            persist_history(state, request_id, ExecutionStatus::Error, None, 0, Some(ComplexityTag::Heavy)).await;
            return;
        }
    };

    let outcome = match cluster.monitor_job(&created.job_id, timeout).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(request_id, job_id = created.job_id, error = %err, "failed to monitor heavy job");
            persist_history(state, request_id, ExecutionStatus::Error, None, 0, Some(ComplexityTag::Heavy)).await;
            return;
        }
    };

    let status = match &outcome {
        dispatch_domain::entities::JobOutcome::Succeeded => ExecutionStatus::Success,
        dispatch_domain::entities::JobOutcome::Failed { reason } => {
            warn!(request_id, job_id = created.job_id, reason, "heavy job reached a terminal failure");
            ExecutionStatus::Failed
        }
        dispatch_domain::entities::JobOutcome::TimedOut => ExecutionStatus::Timeout,
        dispatch_domain::entities::JobOutcome::MonitorError => ExecutionStatus::Error,
    };
    persist_history(state, request_id, status, None, 0, Some(ComplexityTag::Heavy)).await;

    // Successful jobs are left for `ttlSecondsAfterFinished` to reap; only
    // non-success terminal outcomes are cleaned up explicitly here.
    if status != ExecutionStatus::Success {
        if let Err(err) = cluster.delete_job(&created.job_id).await {
            warn!(request_id, job_id = created.job_id, error = %err, "failed to delete completed heavy job");
        }
    }
}

pub(crate) async fn persist_history(state: &AppState, request_id: &str, status: ExecutionStatus, exit_code: Option<i32>, duration_ms: u64, classification: Option<ComplexityTag>) {
    let record = HistoryRecord {
        request_id: request_id.to_string(),
        status,
        classification,
        exit_code,
        duration_ms,
        resource_usage: serde_json::Value::Null,
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    };

    if let Err(err) = state.history.upsert(record).await {
        warn!(request_id, error = %err, "failed to persist job_history record");
    }
}

/// `POST /api/v1/execute_snippet`: runs already-approved code directly in
/// the sandbox, bypassing generation and validation.
pub async fn execute_snippet(State(state): State<AppState>, Extension(correlation_id): Extension<CorrelationId>, Json(body): Json<ExecuteSnippetRequest>) -> impl IntoResponse {
    let request_id = body.request_id.unwrap_or(correlation_id.0);
    let timeout = body.timeout.clamp(1, 300);

    state.inflight.insert(request_id.clone());
    let result = state.retry.execute_with_retry(&body.code, &request_id, timeout).await;
    state.inflight.remove(&request_id);

    persist_history(&state, &request_id, result.status, Some(result.exit_code), result.duration_ms, None).await;

    info!(request_id, status = ?result.status, exit_code = result.exit_code, "execute_snippet completed");

    Json(ExecuteSnippetResponse {
        request_id,
        stdout: result.stdout,
        stderr: result.stderr,
        exit_code: result.exit_code,
        duration_ms: result.duration_ms,
        status: result.status,
    })
    .into_response()
}

/// `POST /api/v1/create_heavy_job`: submits a cluster job directly,
/// bypassing generation and validation. Returns `503` when no cluster job
/// manager is configured.
pub async fn create_heavy_job(State(state): State<AppState>, Extension(correlation_id): Extension<CorrelationId>, Json(body): Json<CreateHeavyJobRequest>) -> impl IntoResponse {
    let request_id = body.request_id.unwrap_or(correlation_id.0);

    let Some(cluster) = state.cluster.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            error_body("Kubernetes Job creation not available", "no cluster job manager is configured", Some(request_id)),
        )
            .into_response();
    };

    let job_request =
        dispatch_domain::entities::JobCreationRequest { request_id, code: body.code, resource_limits: body.resource_limits };

    match cluster.create_job(&job_request).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(CreateHeavyJobResponse { job_id: created.job_id, status: created.status, created_at: chrono::Utc::now().timestamp_millis() }),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to create heavy job");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Internal server error", err.to_string(), None)).into_response()
        }
    }
}

/// `GET /api/v1/health`.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        active_executions: state.inflight.len(),
        service_name: state.service_name.clone(),
        version: state.version.to_string(),
    })
}

/// `GET /api/v1/ready`: probes the history repository to confirm the
/// database is reachable.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let reachable = state.history.list(HistoryQuery { limit: 1, offset: 0, ..Default::default() }).await.is_ok();

    let body = ReadyResponse { ready: reachable, service_name: state.service_name.clone(), active_executions: state.inflight.len() };
    let status = if reachable { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

/// `GET /api/v1/job_history`.
pub async fn job_history_list(State(state): State<AppState>, Query(params): Query<JobHistoryQuery>) -> impl IntoResponse {
    let status_filter = match params.status_filter.as_deref().map(ExecutionStatus::from_str) {
        Some(Ok(status)) => Some(status),
        Some(Err(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                error_body("Invalid argument", format!("unknown statusFilter value: {:?}", params.status_filter), None),
            )
                .into_response();
        }
        None => None,
    };

    let order_direction = match params.order_direction.to_lowercase().as_str() {
        "asc" => dispatch_domain::entities::OrderDirection::Ascending,
        _ => dispatch_domain::entities::OrderDirection::Descending,
    };

    let query = HistoryQuery { limit: params.limit, offset: params.offset, status_filter, order_direction };

    match state.history.list(query).await {
        Ok((records, total)) => (
            StatusCode::OK,
            Json(JobHistoryListResponse {
                total: total as usize,
                limit: params.limit,
                offset: params.offset,
                records: records.into_iter().map(JobHistoryResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to list job_history");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Internal server error", err.to_string(), None)).into_response()
        }
    }
}

/// `GET /api/v1/job_history/{requestId}`.
pub async fn job_history_get(State(state): State<AppState>, Path(request_id): Path<String>) -> impl IntoResponse {
    match state.history.get_by_request_id(&request_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(JobHistoryResponse::from(record))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, error_body("Not found", "no job_history record for this requestId", Some(request_id)))
            .into_response(),
        Err(err) => {
            error!(request_id, error = %err, "failed to fetch job_history record");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Internal server error", err.to_string(), Some(request_id))).into_response()
        }
    }
}
