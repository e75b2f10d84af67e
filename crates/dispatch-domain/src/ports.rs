//! Port traits implemented by the infrastructure layer and consumed by the
//! application layer. Domain code never depends on a concrete transport,
//! process, or storage crate - only on these interfaces.

use crate::entities::{
    CodeExecutionRequest, ExecutionResult, HistoryQuery, HistoryRecord, JobCreationRequest,
    JobCreationResult, JobOutcome,
};
use crate::error::Result;
use async_trait::async_trait;

/// Severity level for the domain logging facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Fine-grained diagnostic detail.
    Trace,
    /// Diagnostic detail useful during development.
    Debug,
    /// Normal operational messages.
    Info,
    /// Recoverable but noteworthy conditions.
    Warn,
    /// Failures.
    Error,
}

/// A text-in / text-out oracle used to generate and correct code.
///
/// Implementations wrap whichever LLM backend is configured; the domain and
/// application layers only ever see prompt in, completion out.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a program from a natural-language task description.
    async fn generate(&self, task: &str) -> Result<String>;

    /// Produce a corrected program given the previous attempt and the
    /// validator findings or runtime error that rejected it.
    async fn correct(&self, previous_code: &str, feedback: &str) -> Result<String>;
}

/// Runs a syntactically valid, validated, lightweight program in-process.
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    /// Execute `code` under the given correlation id and timeout.
    async fn execute(&self, code: &str, request_id: &str, timeout_seconds: u64)
        -> Result<ExecutionResult>;
}

/// Submits, monitors, and tears down one-shot cluster jobs for heavy code.
#[async_trait]
pub trait ClusterJobManager: Send + Sync {
    /// Submit a new job and return its derived identifier.
    async fn create_job(&self, request: &JobCreationRequest) -> Result<JobCreationResult>;

    /// Block until the job reaches a terminal state or the monitor's own
    /// timeout elapses.
    async fn monitor_job(&self, job_id: &str, timeout_seconds: u64) -> Result<JobOutcome>;

    /// Delete the job and its pods. Returns `true` if the job existed.
    async fn delete_job(&self, job_id: &str) -> Result<bool>;
}

/// Durable object storage for execution result blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` to `container/name`, returning an addressable location.
    async fn put(&self, container: &str, name: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Publishes domain events (e.g. job-failure notifications) to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a JSON-serializable payload to `topic`.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()>;
}

/// Consumes at-least-once code-execution-request messages from the bus.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Receive the next message, or `None` when the subscription is closed.
    ///
    /// Implementations must not acknowledge the message; the caller does so
    /// via [`AckHandle::ack`] only after the request has been fully routed.
    async fn receive(&self) -> Result<Option<(CodeExecutionRequest, Box<dyn AckHandle>)>>;
}

/// A pending acknowledgement for one message-bus delivery.
#[async_trait]
pub trait AckHandle: Send + Sync {
    /// Acknowledge successful processing. Never called on failure, so the
    /// bus redelivers unacknowledged messages (at-least-once).
    async fn ack(self: Box<Self>) -> Result<()>;
}

/// Persists and retrieves execution history, keyed by request id.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Insert a new record, or update the existing one for this request id.
    async fn upsert(&self, record: HistoryRecord) -> Result<()>;

    /// Fetch the record for a single request id, if one exists.
    async fn get_by_request_id(&self, request_id: &str) -> Result<Option<HistoryRecord>>;

    /// List records matching `query`, alongside the total count of records
    /// matching its filter (ignoring `limit`/`offset`) - the pagination
    /// metadata the job-history list endpoint reports.
    async fn list(&self, query: HistoryQuery) -> Result<(Vec<HistoryRecord>, u64)>;
}
