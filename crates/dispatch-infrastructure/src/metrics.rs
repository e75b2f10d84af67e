//! Prometheus metrics export, the observation sink spec.md treats as an
//! external collaborator but which the teacher always carries as ambient
//! infrastructure (`metrics` + `metrics-exporter-prometheus`).

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the global `metrics` recorder and returns a handle whose
/// [`PrometheusHandle::render`] backs the `/metrics` HTTP route.
///
/// # Errors
///
/// Returns an error if a recorder is already installed (e.g. called twice
/// in the same process).
pub fn install() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Names of the counters and histograms this engine emits, collected in
/// one place so call sites never hand-type a metric name twice.
pub mod names {
    /// Counter: total orchestration runs, labeled by terminal status.
    pub const ORCHESTRATION_RUNS_TOTAL: &str = "dispatch_orchestration_runs_total";
    /// Histogram: sandbox execution wall-clock duration, in milliseconds.
    pub const SANDBOX_DURATION_MS: &str = "dispatch_sandbox_duration_ms";
    /// Counter: cluster jobs created, labeled by outcome once monitored.
    pub const CLUSTER_JOBS_TOTAL: &str = "dispatch_cluster_jobs_total";
    /// Gauge: requests currently in flight on the request surface.
    pub const INFLIGHT_EXECUTIONS: &str = "dispatch_inflight_executions";
    /// Counter: async consumer messages processed, labeled by outcome.
    pub const CONSUMER_MESSAGES_TOTAL: &str = "dispatch_consumer_messages_total";
}
