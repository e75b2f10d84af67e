//! Composition root: the shared, `Clone`-cheap application state Axum
//! handlers and the C9 consumer both close over.
//!
//! Follows the `Arc<dyn Trait>` dependency-inversion pattern already used
//! throughout `dispatch-application`/`dispatch-infrastructure`, rather than
//! the teacher's full Shaku-registry DI container (`mcb-infrastructure::di`)
//! - this engine has a handful of ports, not the dozens of swappable
//! provider kinds that container exists to manage.

use dashmap::DashSet;
use dispatch_application::orchestrator::{Classify, Validate};
use dispatch_application::{Orchestrator, RetryCoordinator};
use dispatch_domain::entities::{ComplexityTag, ValidationVerdict};
use dispatch_domain::error::Result;
use dispatch_domain::ports::{BlobStore, ClusterJobManager, EventPublisher, HistoryRepository, LlmProvider, SandboxExecutor};
use dispatch_infrastructure::EngineConfig;
use dispatch_validate::{classify_source, CodeValidator};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Adapts `dispatch-validate`'s `CodeValidator` to the orchestrator's local
/// `Validate` port, so `dispatch-application` never depends on the rule
/// engine directly.
struct ValidatorAdapter(CodeValidator);

impl Validate for ValidatorAdapter {
    fn validate(&self, code: &str) -> Result<ValidationVerdict> {
        self.0.validate(code)
    }
}

/// Adapts `dispatch-validate::classify_source` to the orchestrator's local
/// `Classify` port.
struct ClassifierAdapter;

impl Classify for ClassifierAdapter {
    fn classify(&self, code: &str) -> ComplexityTag {
        classify_source(code)
    }
}

/// Shared state for every HTTP handler and the consumer supervisor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub llm: Arc<dyn LlmProvider>,
    pub sandbox: Arc<dyn SandboxExecutor>,
    pub retry: Arc<RetryCoordinator>,
    pub cluster: Option<Arc<dyn ClusterJobManager>>,
    pub blob: Arc<dyn BlobStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub history: Arc<dyn HistoryRepository>,
    pub orchestrator: Arc<Orchestrator>,
    pub validator: Arc<CodeValidator>,
    /// `requestId`s currently executing, per spec.md §5's process-wide
    /// inflight map. Readers (the health endpoint) tolerate stale reads;
    /// `DashSet` gives lock-free insert/remove on the hot path.
    pub inflight: Arc<DashSet<String>>,
    pub metrics_handle: PrometheusHandle,
    pub service_name: String,
    pub version: &'static str,
}

impl AppState {
    /// Assemble the composition root from concrete adapters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<EngineConfig>,
        llm: Arc<dyn LlmProvider>,
        sandbox: Arc<dyn SandboxExecutor>,
        cluster: Option<Arc<dyn ClusterJobManager>>,
        blob: Arc<dyn BlobStore>,
        publisher: Arc<dyn EventPublisher>,
        history: Arc<dyn HistoryRepository>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let validator = Arc::new(CodeValidator::from_config(&config.validation));
        let retry = Arc::new(RetryCoordinator::new(Arc::clone(&sandbox), config.max_execution_retries));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&llm),
            Arc::new(ValidatorAdapter(CodeValidator::from_config(&config.validation))),
            Arc::new(ClassifierAdapter),
        ));

        Self {
            service_name: config.service_name.clone(),
            config,
            llm,
            sandbox,
            retry,
            cluster,
            blob,
            publisher,
            history,
            orchestrator,
            validator,
            inflight: Arc::new(DashSet::new()),
            metrics_handle,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
