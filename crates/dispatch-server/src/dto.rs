//! Request/response bodies for the HTTP surface.
//!
//! Field names and shapes are grounded on
//! `original_source/src/llm_executor/executor_service/api.py`'s Pydantic
//! models (`ExecuteSnippetRequest/Response`, `HealthResponse`,
//! `CreateHeavyJobRequest/Response`, `JobHistoryResponse/ListResponse`),
//! translated to spec.md §6's camelCase wire contract.

use dispatch_domain::entities::{ComplexityTag, ExecutionStatus, HistoryRecord, ResourceLimits};
use serde::{Deserialize, Serialize};

fn default_max_retries() -> u32 {
    3
}

/// `POST /api/v1/query` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub timeout: Option<u64>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Nested execution summary inside `QueryResponse`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExecutionResult {
    pub validation_passed: bool,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
    pub classification: Option<ComplexityTag>,
}

/// `POST /api/v1/query` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub request_id: String,
    pub generated_code: String,
    pub execution_result: QueryExecutionResult,
    pub status: String,
    pub classification: Option<ComplexityTag>,
    pub validation_attempts: u32,
}

/// `POST /api/v1/execute_snippet` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSnippetRequest {
    pub code: String,
    pub timeout: u64,
    pub request_id: Option<String>,
}

/// `POST /api/v1/execute_snippet` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSnippetResponse {
    pub request_id: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub status: ExecutionStatus,
}

/// `POST /api/v1/create_heavy_job` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHeavyJobRequest {
    pub code: String,
    pub request_id: Option<String>,
    #[serde(default)]
    pub resource_limits: ResourceLimits,
}

/// `POST /api/v1/create_heavy_job` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHeavyJobResponse {
    pub job_id: String,
    pub status: String,
    pub created_at: i64,
}

/// `GET /api/v1/health` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_executions: usize,
    pub service_name: String,
    pub version: String,
}

/// `GET /api/v1/ready` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub ready: bool,
    pub service_name: String,
    pub active_executions: usize,
}

/// Pagination query parameters for `GET /api/v1/job_history`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub status_filter: Option<String>,
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default = "default_order_direction")]
    pub order_direction: String,
}

fn default_limit() -> u32 {
    100
}

fn default_order_by() -> String {
    "timestamp".to_string()
}

fn default_order_direction() -> String {
    "desc".to_string()
}

/// One `job_history` row as exposed over HTTP.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHistoryResponse {
    pub request_id: String,
    pub timestamp: i64,
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub resource_usage: serde_json::Value,
    pub classification: Option<ComplexityTag>,
}

impl From<HistoryRecord> for JobHistoryResponse {
    fn from(record: HistoryRecord) -> Self {
        Self {
            request_id: record.request_id,
            timestamp: record.timestamp_ms,
            status: record.status,
            exit_code: record.exit_code,
            duration_ms: record.duration_ms,
            resource_usage: record.resource_usage,
            classification: record.classification,
        }
    }
}

/// `GET /api/v1/job_history` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHistoryListResponse {
    pub total: usize,
    pub limit: u32,
    pub offset: u32,
    pub records: Vec<JobHistoryResponse>,
}

/// Uniform error body for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub request_id: Option<String>,
}
