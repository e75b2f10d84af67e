//! Core entities and value objects exchanged between components.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request to generate and execute code for a natural-language task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExecutionRequest {
    /// Caller-supplied or generated correlation identifier.
    pub request_id: String,
    /// The Python source to execute.
    pub code: String,
    /// Timeout in seconds; falls back to the configured default when absent.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Maximum number of retries the coordinator may attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

/// Outcome of a generate/validate/correct/classify/route pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// The program ran to completion with exit code zero.
    Success,
    /// The program ran to completion with a non-zero exit code.
    Failed,
    /// The program did not finish within its allotted time.
    Timeout,
    /// The program was never executed: it failed validation or generation.
    Rejected,
    /// An internal error prevented the program from being dispatched.
    Error,
}

crate::impl_from_str!(ExecutionStatus, "unknown execution status: {}", {
    "success" => ExecutionStatus::Success,
    "failed" => ExecutionStatus::Failed,
    "timeout" => ExecutionStatus::Timeout,
    "rejected" => ExecutionStatus::Rejected,
    "error" => ExecutionStatus::Error,
});

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Rejected => "rejected",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Complexity classification for a syntactically valid program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityTag {
    /// Safe to run in-process, in the sandbox executor.
    Lightweight,
    /// Requires the cluster job manager's dedicated container.
    Heavy,
}

crate::impl_from_str!(ComplexityTag, "unknown complexity tag: {}", {
    "lightweight" => ComplexityTag::Lightweight,
    "heavy" => ComplexityTag::Heavy,
});

impl std::fmt::Display for ComplexityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Lightweight => "lightweight",
            Self::Heavy => "heavy",
        };
        write!(f, "{s}")
    }
}

/// A single security-rule violation found in a submitted program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Name of the rule that produced this finding.
    pub rule: &'static str,
    /// Human-readable explanation of the violation.
    pub message: String,
    /// 1-based source line the finding anchors to, when known.
    pub line: Option<usize>,
}

/// Aggregate result of running the security-validator rule pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// All findings from all rules, in rule-registration order.
    pub findings: Vec<Finding>,
}

impl ValidationVerdict {
    /// True when no rule produced a finding.
    pub fn is_allowed(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Resource limits applied to a heavy-path container job.
///
/// Defaults mirror the original execution platform's `ResourceLimits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU limit, Kubernetes quantity syntax.
    pub cpu_limit: String,
    /// Memory limit, Kubernetes quantity syntax.
    pub memory_limit: String,
    /// CPU request, Kubernetes quantity syntax.
    pub cpu_request: String,
    /// Memory request, Kubernetes quantity syntax.
    pub memory_request: String,
    /// Ephemeral disk limit, Kubernetes quantity syntax.
    pub disk_limit: String,
    /// Wall-clock timeout enforced both by the container and the monitor.
    pub timeout_seconds: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_limit: "4".to_string(),
            memory_limit: "8Gi".to_string(),
            cpu_request: "2".to_string(),
            memory_request: "4Gi".to_string(),
            disk_limit: "10Gi".to_string(),
            timeout_seconds: 300,
        }
    }
}

/// Result of running a program, whether in the sandbox or a cluster job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Correlation identifier of the originating request.
    pub request_id: String,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code; `-1` when the process never produced one.
    pub exit_code: i32,
    /// Wall-clock duration of the attempt, in milliseconds.
    pub duration_ms: u64,
    /// Final disposition of the attempt.
    pub status: ExecutionStatus,
}

/// Request to submit a program to the cluster job manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreationRequest {
    /// Correlation identifier of the originating request.
    pub request_id: String,
    /// The Python source to execute.
    pub code: String,
    /// Resource limits to apply to the job's pod.
    #[serde(default)]
    pub resource_limits: ResourceLimits,
}

/// Response from submitting a cluster job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreationResult {
    /// The derived, DNS-label-safe Kubernetes Job name.
    pub job_id: String,
    /// Initial job status, always `"submitted"` at creation time.
    pub status: String,
}

/// Terminal state of a monitored cluster job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// The job's pod exited with status `Succeeded`.
    Succeeded,
    /// The job exhausted its backoff limit or exceeded its active deadline.
    ///
    /// `reason` carries the failed condition's `reason` field (e.g.
    /// `"DeadlineExceeded"`, `"BackoffLimitExceeded"`), or `"Unknown"` when
    /// the Job status didn't surface one.
    Failed { reason: String },
    /// The job did not reach a terminal state before the monitor's timeout.
    TimedOut,
    /// An error talking to the orchestrator API prevented a determination.
    MonitorError,
}

/// Historical record of one execution attempt, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Correlation identifier of the originating request.
    pub request_id: String,
    /// Final disposition.
    pub status: ExecutionStatus,
    /// Complexity classification, when the program reached that stage.
    pub classification: Option<ComplexityTag>,
    /// Process exit code, when the program ran.
    pub exit_code: Option<i32>,
    /// Wall-clock duration of the final attempt, in milliseconds.
    pub duration_ms: u64,
    /// Free-form resource usage metadata (e.g. peak memory) as recorded.
    pub resource_usage: serde_json::Value,
    /// Millisecond Unix timestamp the record was last written.
    pub timestamp_ms: i64,
}

/// Sort direction for [`crate::ports::HistoryRepository::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Oldest first.
    Ascending,
    /// Most recent first.
    Descending,
}

impl Default for OrderDirection {
    fn default() -> Self {
        Self::Descending
    }
}

/// Pagination, filter, and ordering parameters for listing execution
/// history, mirroring `JobHistoryRepository.get_all`/`get_by_status`'s
/// combined parameter set.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Maximum number of records to return.
    pub limit: u32,
    /// Number of records to skip.
    pub offset: u32,
    /// Restrict to records with this status, when set.
    pub status_filter: Option<ExecutionStatus>,
    /// Sort direction on the timestamp column.
    pub order_direction: OrderDirection,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self { limit: 100, offset: 0, status_filter: None, order_direction: OrderDirection::Descending }
    }
}

/// Per-rule enable/disable switches, mirroring a layered configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRulesConfig {
    /// Enable the no-file-I/O rule.
    pub enable_file_io_check: bool,
    /// Enable the no-OS-commands rule.
    pub enable_os_commands_check: bool,
    /// Enable the no-network rule.
    pub enable_network_check: bool,
    /// Enable the import allowlist/prohibition rule.
    pub enable_import_validation: bool,
    /// Modules permitted by the import rule, beyond the built-in defaults.
    pub allowed_imports: Vec<String>,
    /// Timeout for the tree-sitter parse step itself, in milliseconds.
    pub ast_parsing_timeout_ms: u64,
}

impl Default for ValidationRulesConfig {
    fn default() -> Self {
        Self {
            enable_file_io_check: true,
            enable_os_commands_check: true,
            enable_network_check: true,
            enable_import_validation: true,
            allowed_imports: Vec::new(),
            ast_parsing_timeout_ms: 30,
        }
    }
}

/// Metric label map, reused across executor/classifier/retry instrumentation.
pub type Labels = HashMap<String, String>;
