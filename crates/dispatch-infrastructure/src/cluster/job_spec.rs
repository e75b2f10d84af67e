//! Pure helpers for the cluster-job manager: job-id derivation, the
//! `batch/v1` `Job` template, and terminal-state classification. Kept
//! separate from [`super::KubernetesJobManager`] so they can be unit
//! tested without a live cluster.
//!
//! Verbatim from
//! `original_source/src/llm_executor/executor_service/kubernetes_job_manager.py`'s
//! `_generate_job_id` and `_build_job_spec`.

use std::collections::BTreeMap;

use dispatch_domain::entities::{JobCreationRequest, JobOutcome};
use k8s_openapi::api::batch::v1::{Job, JobSpec, JobStatus};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, ExecAction, Lifecycle, LifecycleHandler, PodSecurityContext, PodSpec,
    PodTemplateSpec, ResourceRequirements, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

const JOB_ID_PREFIX: &str = "heavy-executor-";

/// Derive a DNS-label-safe Kubernetes Job name from a correlation id.
///
/// Keeps only lowercase alphanumerics and hyphens, prefixes with `job-`
/// when the result wouldn't start with an alphanumeric, truncates to 50
/// characters, then prepends `heavy-executor-` (total length <= 63).
pub fn derive_job_id(request_id: &str) -> String {
    let mut clean: String =
        request_id.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').map(|c| c.to_ascii_lowercase()).collect();

    if let Some(first) = clean.chars().next() {
        if !first.is_ascii_alphanumeric() {
            clean = format!("job-{clean}");
        }
    }

    clean.truncate(50);
    format!("{JOB_ID_PREFIX}{clean}")
}

/// Build the `Job` template for one heavy-execution request.
///
/// All fields spec.md §4.6 marks contractually required are present:
/// single fixed-image container, `CODE`/`REQUEST_ID`/`TIMEOUT` env vars,
/// resource requests/limits from the request's `ResourceLimits`, a
/// non-root read-only-rootfs security context, a pre-stop hook,
/// `restartPolicy: Never`, `backoffLimit: 0`, and the configured
/// `ttlSecondsAfterFinished`.
pub fn build_job_spec(job_id: &str, request: &JobCreationRequest, image: &str, ttl_seconds: i32) -> Job {
    let limits = &request.resource_limits;

    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), "heavy-executor".to_string());
    labels.insert("requestId".to_string(), request.request_id.clone());
    labels.insert("component".to_string(), "job-runner".to_string());

    let mut resource_limits = BTreeMap::new();
    resource_limits.insert("cpu".to_string(), Quantity(limits.cpu_limit.clone()));
    resource_limits.insert("memory".to_string(), Quantity(limits.memory_limit.clone()));
    let mut resource_requests = BTreeMap::new();
    resource_requests.insert("cpu".to_string(), Quantity(limits.cpu_request.clone()));
    resource_requests.insert("memory".to_string(), Quantity(limits.memory_request.clone()));

    let container = Container {
        name: "executor".to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: Some(vec![
            EnvVar { name: "CODE".to_string(), value: Some(request.code.clone()), value_from: None },
            EnvVar { name: "REQUEST_ID".to_string(), value: Some(request.request_id.clone()), value_from: None },
            EnvVar { name: "TIMEOUT".to_string(), value: Some(limits.timeout_seconds.to_string()), value_from: None },
        ]),
        resources: Some(ResourceRequirements {
            limits: Some(resource_limits),
            requests: Some(resource_requests),
            claims: None,
        }),
        security_context: Some(SecurityContext {
            run_as_non_root: Some(true),
            run_as_user: Some(1000),
            read_only_root_filesystem: Some(true),
            allow_privilege_escalation: Some(false),
            ..Default::default()
        }),
        lifecycle: Some(Lifecycle {
            pre_stop: Some(LifecycleHandler {
                exec: Some(ExecAction {
                    command: Some(vec![
                        "/bin/sh".to_string(),
                        "-c".to_string(),
                        "echo 'Graceful shutdown initiated'".to_string(),
                    ]),
                }),
                ..Default::default()
            }),
            post_start: None,
        }),
        ..Default::default()
    };

    let pod_template = PodTemplateSpec {
        metadata: Some(ObjectMeta { labels: Some(labels.clone()), ..Default::default() }),
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            containers: vec![container],
            security_context: Some(PodSecurityContext::default()),
            ..Default::default()
        }),
    };

    Job {
        metadata: ObjectMeta { name: Some(job_id.to_string()), labels: Some(labels), ..Default::default() },
        spec: Some(JobSpec {
            template: pod_template,
            backoff_limit: Some(0),
            ttl_seconds_after_finished: Some(ttl_seconds),
            ..Default::default()
        }),
        status: None,
    }
}

/// Classify a polled `JobStatus` into a terminal [`JobOutcome`], or `None`
/// if the job is still running and no terminal condition applies.
///
/// Mirrors `error_handlers.py::JobErrorHandler.monitor_job`'s status
/// checks, excluding the monitor-deadline and API-error cases (handled by
/// the caller's polling loop, which has no job-status counterpart).
pub fn classify_status(status: &JobStatus, max_job_retries: u32) -> Option<JobOutcome> {
    if status.succeeded.unwrap_or(0) >= 1 {
        return Some(JobOutcome::Succeeded);
    }

    if status.failed.unwrap_or(0) >= max_job_retries as i32 {
        return Some(JobOutcome::Failed { reason: failure_reason(status) });
    }

    if let Some(conditions) = &status.conditions {
        for condition in conditions {
            if condition.type_ == "Failed" && condition.status == "True" {
                return Some(JobOutcome::Failed { reason: failure_reason(status) });
            }
            if condition.reason.as_deref() == Some("DeadlineExceeded") {
                return Some(JobOutcome::Failed { reason: "DeadlineExceeded".to_string() });
            }
        }
    }

    None
}

/// Extract the failure reason from the first `Failed`-type condition,
/// matching `error_handlers.py`'s `_get_failure_reason`.
fn failure_reason(status: &JobStatus) -> String {
    status
        .conditions
        .as_ref()
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Failed"))
        .and_then(|condition| condition.reason.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobCondition;

    #[test]
    fn job_id_is_lowercased_and_prefixed() {
        assert_eq!(derive_job_id("Req-123"), "heavy-executor-req-123");
    }

    #[test]
    fn job_id_strips_disallowed_characters() {
        assert_eq!(derive_job_id("req_123!@#abc"), "heavy-executor-req123abc");
    }

    #[test]
    fn job_id_gets_job_prefix_when_starting_non_alphanumeric() {
        assert_eq!(derive_job_id("-leading-hyphen"), "heavy-executor-job--leading-hyphen");
    }

    #[test]
    fn job_id_truncates_to_fifty_before_the_fixed_prefix() {
        let long_id = "a".repeat(100);
        let job_id = derive_job_id(&long_id);
        assert_eq!(job_id.len(), JOB_ID_PREFIX.len() + 50);
        assert!(job_id.len() <= 63);
    }

    #[test]
    fn job_id_is_deterministic() {
        assert_eq!(derive_job_id("same-id"), derive_job_id("same-id"));
    }

    fn status_with(succeeded: Option<i32>, failed: Option<i32>, conditions: Vec<JobCondition>) -> JobStatus {
        JobStatus { succeeded, failed, conditions: Some(conditions), ..Default::default() }
    }

    #[test]
    fn one_success_is_terminal_success() {
        let status = status_with(Some(1), None, vec![]);
        assert_eq!(classify_status(&status, 3), Some(JobOutcome::Succeeded));
    }

    #[test]
    fn failures_below_the_retry_limit_stay_running() {
        let status = status_with(None, Some(1), vec![]);
        assert_eq!(classify_status(&status, 3), None);
    }

    #[test]
    fn failures_at_the_retry_limit_are_terminal_failure() {
        let status = status_with(None, Some(3), vec![]);
        assert_eq!(classify_status(&status, 3), Some(JobOutcome::Failed { reason: "Unknown".to_string() }));
    }

    #[test]
    fn a_failed_condition_is_terminal_even_under_the_retry_limit() {
        let condition = JobCondition {
            type_: "Failed".to_string(),
            status: "True".to_string(),
            reason: Some("BackoffLimitExceeded".to_string()),
            ..Default::default()
        };
        let status = status_with(None, Some(1), vec![condition]);
        assert_eq!(
            classify_status(&status, 3),
            Some(JobOutcome::Failed { reason: "BackoffLimitExceeded".to_string() })
        );
    }

    #[test]
    fn deadline_exceeded_condition_is_terminal_failure() {
        let condition = JobCondition {
            type_: "Failed".to_string(),
            status: "False".to_string(),
            reason: Some("DeadlineExceeded".to_string()),
            ..Default::default()
        };
        let status = status_with(None, None, vec![condition]);
        assert_eq!(classify_status(&status, 3), Some(JobOutcome::Failed { reason: "DeadlineExceeded".to_string() }));
    }

    #[test]
    fn no_terminal_signal_keeps_the_job_running() {
        let status = status_with(Some(0), Some(0), vec![]);
        assert_eq!(classify_status(&status, 3), None);
    }
}
