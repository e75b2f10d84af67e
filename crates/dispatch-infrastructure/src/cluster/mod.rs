//! Cluster-job manager (C6): submits, monitors, and tears down one-shot
//! `batch/v1` Jobs for heavy code, via the `kube` client.
//!
//! Grounded on
//! `original_source/src/llm_executor/executor_service/kubernetes_job_manager.py`'s
//! `KubernetesJobManager` and `error_handlers.py`'s
//! `JobErrorHandler.monitor_job`. The original watches the orchestrator's
//! job-watch stream directly; here the monitor polls `Api::get_status` on
//! a fixed interval bounded by the caller's deadline, since the terminal
//! conditions in spec.md §4.6's table are all derivable from a single
//! `JobStatus` snapshot and polling avoids coupling to a specific
//! watch-stream event shape across `kube` versions.

pub mod job_spec;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dispatch_domain::entities::{JobCreationRequest, JobCreationResult, JobOutcome};
use dispatch_domain::error::{Error, Result};
use dispatch_domain::ports::ClusterJobManager;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, DeleteParams, PostParams};
use tracing::{error, info, warn};

/// The interval between `monitor_job` status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// `ClusterJobManager` backed by a real Kubernetes `batch/v1` API.
pub struct KubernetesJobManager {
    client: kube::Client,
    namespace: String,
    image: String,
    ttl_seconds: i32,
    max_job_retries: u32,
}

impl KubernetesJobManager {
    /// Connect using the ambient kubeconfig or in-cluster service account,
    /// per `kube::Client::try_default`'s own resolution order.
    ///
    /// # Errors
    ///
    /// Returns an error when no usable cluster configuration is found.
    pub async fn try_new(namespace: impl Into<String>, image: impl Into<String>, ttl_seconds: i32, max_job_retries: u32) -> Result<Self> {
        let client = kube::Client::try_default()
            .await
            .map_err(|e| Error::orchestrator_api_with_source("failed to initialize Kubernetes client", e))?;
        Ok(Self { client, namespace: namespace.into(), image: image.into(), ttl_seconds, max_job_retries })
    }

    fn jobs_api(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl ClusterJobManager for KubernetesJobManager {
    async fn create_job(&self, request: &JobCreationRequest) -> Result<JobCreationResult> {
        let job_id = job_spec::derive_job_id(&request.request_id);
        let job = job_spec::build_job_spec(&job_id, request, &self.image, self.ttl_seconds);

        info!(request_id = %request.request_id, job_id, namespace = %self.namespace, "creating heavy job");

        self.jobs_api()
            .create(&PostParams::default(), &job)
            .await
            .map_err(|e| Error::orchestrator_api_with_source(format!("failed to create job {job_id}"), e))?;

        Ok(JobCreationResult { job_id, status: "submitted".to_string() })
    }

    async fn monitor_job(&self, job_id: &str, timeout_seconds: u64) -> Result<JobOutcome> {
        let api = self.jobs_api();
        let deadline = Instant::now() + Duration::from_secs(timeout_seconds);

        loop {
            if Instant::now() >= deadline {
                warn!(job_id, timeout_seconds, "job monitoring deadline elapsed");
                return Ok(JobOutcome::TimedOut);
            }

            match api.get_status(job_id).await {
                Ok(job) => {
                    if let Some(status) = &job.status {
                        if let Some(outcome) = job_spec::classify_status(status, self.max_job_retries) {
                            info!(job_id, ?outcome, "job reached terminal state");
                            return Ok(outcome);
                        }
                    }
                }
                Err(e) => {
                    error!(job_id, error = %e, "error polling job status");
                    return Ok(JobOutcome::MonitorError);
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn delete_job(&self, job_id: &str) -> Result<bool> {
        match self.jobs_api().delete(job_id, &DeleteParams::background()).await {
            Ok(_) => {
                info!(job_id, "job deleted");
                Ok(true)
            }
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(false),
            Err(e) => Err(Error::orchestrator_api_with_source(format!("failed to delete job {job_id}"), e)),
        }
    }
}
