//! Binary entry point: composition root for the secure code dispatch
//! engine. Loads configuration, wires every port to its concrete
//! infrastructure adapter, and starts both the Axum HTTP listener (C8) and
//! the NATS JetStream consumer supervisor (C9) side by side on one
//! `tokio` runtime.
//!
//! Mirrors `mcb`'s own top-level binary: a thin `main` that builds the
//! composition root and hands off to the framework, with no business
//! logic of its own.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dispatch_domain::ports::{BlobStore, ClusterJobManager, EventPublisher, HistoryRepository, LlmProvider, SandboxExecutor};
use dispatch_infrastructure::{
    EngineConfig, FilesystemBlobStore, HttpLlmProvider, KubernetesJobManager, NatsEventPublisher, NatsMessageConsumer,
    ProcessSandboxExecutor, SeaOrmHistoryRepository,
};
use dispatch_server::{build_router, run_consumer, AppState};
use tracing::{error, info, warn};

/// Secure LLM code dispatch engine.
#[derive(Parser, Debug)]
#[command(name = "dispatch-server")]
#[command(about = "Request surface and async consumer for the secure code dispatch engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Number of bus deliveries the async consumer processes concurrently.
    #[arg(long, default_value_t = 8)]
    consumer_concurrency: usize,

    /// Skip starting the NATS consumer supervisor, e.g. for local HTTP-only
    /// development against a bus that isn't running.
    #[arg(long)]
    no_consumer: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load()?;
    let _log_guard = dispatch_infrastructure::logging::init(&config.log_level, &config.log_dir);

    info!(service_name = %config.service_name, api_host = %config.api_host, api_port = config.api_port, "starting dispatch engine");

    let metrics_handle = dispatch_infrastructure::metrics::install()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    let config = Arc::new(config);

    let llm: Arc<dyn LlmProvider> = Arc::new(HttpLlmProvider::new(
        config.llm_endpoint.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
        Duration::from_secs(config.llm_timeout_seconds),
    )?);

    let sandbox: Arc<dyn SandboxExecutor> = Arc::new(ProcessSandboxExecutor::new(config.python_interpreter.clone()));

    let blob: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::new(config.storage_root.clone()));

    let history: Arc<dyn HistoryRepository> = Arc::new(SeaOrmHistoryRepository::connect(&config.database_url).await?);

    let publisher: Arc<dyn EventPublisher> = Arc::new(NatsEventPublisher::connect(&config.nats_url).await?);

    let cluster: Option<Arc<dyn ClusterJobManager>> = match KubernetesJobManager::try_new(
        config.kubernetes_namespace.clone(),
        config.kubernetes_job_image.clone(),
        config.kubernetes_job_ttl_seconds,
        config.max_job_retries,
    )
    .await
    {
        Ok(manager) => Some(Arc::new(manager) as Arc<dyn ClusterJobManager>),
        Err(err) => {
            warn!(error = %err, "no Kubernetes cluster reachable; /api/v1/create_heavy_job will report 503");
            None
        }
    };

    let state = AppState::new(Arc::clone(&config), llm, sandbox, cluster, blob, publisher, history, metrics_handle);

    if !cli.no_consumer {
        match NatsMessageConsumer::connect(
            &config.nats_url,
            &config.nats_requests_subject,
            &format!("{}-requests", config.service_name),
            &format!("{}-consumer", config.service_name),
        )
        .await
        {
            Ok(consumer) => {
                let consumer = Arc::new(consumer);
                let consumer_state = state.clone();
                let concurrency = cli.consumer_concurrency;
                tokio::spawn(async move {
                    run_consumer(consumer, consumer_state, concurrency).await;
                });
            }
            Err(err) => {
                error!(error = %err, "failed to start async consumer; the bus surface will not run");
            }
        }
    }

    let router = build_router(state);
    let address = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address, "listening");

    axum::serve(listener, router).await?;

    Ok(())
}
