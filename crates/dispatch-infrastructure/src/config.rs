//! Layered configuration: a `dispatch.toml` file merged with environment
//! variables, following the teacher's Figment-over-Loco pattern but
//! applied directly since this workspace carries `figment` on its own
//! rather than through `loco-rs`.
//!
//! Field names and defaults mirror
//! `original_source/src/llm_executor/shared/config.py`'s settings classes.

use dispatch_domain::entities::{ResourceLimits, ValidationRulesConfig};
use dispatch_domain::error::{Error, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Full process configuration, assembled from defaults, an optional TOML
/// file, then environment variables (highest precedence), in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"dispatch=debug,warn"`.
    pub log_level: String,
    /// Directory the rolling-daily file appender writes into.
    pub log_dir: String,
    /// Identifies this process in logs and metrics.
    pub service_name: String,
    /// HTTP bind address for the Axum server.
    pub api_host: String,
    /// HTTP bind port for the Axum server.
    pub api_port: u16,

    /// Base URL of the LLM provider.
    pub llm_endpoint: String,
    /// Bearer credential for the LLM provider; empty when unauthenticated.
    pub llm_api_key: String,
    /// Model identifier passed to the LLM provider.
    pub llm_model: String,
    /// HTTP request timeout for LLM calls, in seconds.
    pub llm_timeout_seconds: u64,

    /// Default lightweight-execution timeout when a request omits one.
    pub execution_timeout_seconds: u64,
    /// `maxRetries` bound when a request omits one.
    pub max_execution_retries: u32,
    /// Python interpreter resolved for the sandbox; `python3` by default.
    pub python_interpreter: String,

    /// Kubernetes namespace heavy jobs are created in.
    pub kubernetes_namespace: String,
    /// Container image the heavy-job pod runs.
    pub kubernetes_job_image: String,
    /// `ttlSecondsAfterFinished` applied to completed jobs.
    pub kubernetes_job_ttl_seconds: i32,
    /// `backoffLimit`'s companion: job-level retries the monitor tolerates
    /// before declaring the job failed.
    pub max_job_retries: u32,

    /// NATS server URL for the JetStream message bus.
    pub nats_url: String,
    /// Subject the async consumer subscribes to.
    pub nats_requests_subject: String,
    /// Subject completion events are published to.
    pub nats_results_subject: String,

    /// Root directory for the filesystem-backed blob store.
    pub storage_root: String,
    /// Logical container/bucket name for execution-result blobs.
    pub storage_container: String,

    /// `sea-orm` connection string for the `job_history` table.
    pub database_url: String,

    /// Retention window for info-level logs, in days.
    pub log_retention_info_days: u32,
    /// Retention window for error-level logs, in days.
    pub log_retention_error_days: u32,

    /// Per-rule enable switches and the import allowlist for C2.
    pub validation: ValidationRulesConfig,
    /// Default resource envelope for heavy jobs.
    pub resource_limits: ResourceLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            service_name: "dispatch-engine".to_string(),
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,

            llm_endpoint: "http://localhost:8080".to_string(),
            llm_api_key: String::new(),
            llm_model: "gpt-4".to_string(),
            llm_timeout_seconds: 30,

            execution_timeout_seconds: 30,
            max_execution_retries: 3,
            python_interpreter: "python3".to_string(),

            kubernetes_namespace: "default".to_string(),
            kubernetes_job_image: "heavy-executor:latest".to_string(),
            kubernetes_job_ttl_seconds: 3600,
            max_job_retries: 3,

            nats_url: "nats://localhost:4222".to_string(),
            nats_requests_subject: "code-execution-requests".to_string(),
            nats_results_subject: "execution-results".to_string(),

            storage_root: "./data/blobs".to_string(),
            storage_container: "execution-results".to_string(),

            database_url: "sqlite://./data/dispatch.db?mode=rwc".to_string(),

            log_retention_info_days: 30,
            log_retention_error_days: 90,

            validation: ValidationRulesConfig::default(),
            resource_limits: ResourceLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration layering, in increasing precedence: built-in
    /// defaults, `dispatch.toml` in the current directory (if present),
    /// then environment variables (case-insensitive, unprefixed - matching
    /// spec.md's `LOG_LEVEL`, `API_PORT`, etc. naming).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a present value fails to parse into
    /// its field type.
    pub fn load() -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("dispatch.toml"))
            .merge(Env::raw())
            .extract()
            .map_err(|e| Error::config(e.to_string()))
    }
}
