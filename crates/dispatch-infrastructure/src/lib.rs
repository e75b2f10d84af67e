//! Infrastructure layer for the secure code dispatch engine.
//!
//! Implements every port `dispatch-domain` declares against a concrete
//! collaborator: an OS-process sandbox (C4), a Kubernetes `batch/v1` Job
//! manager (C6), an HTTP-backed LLM client, a `sea-orm` history repository,
//! a filesystem blob store, and a NATS JetStream message bus (C9). Also
//! owns layered configuration, logging setup, and metrics export - the
//! ambient concerns the domain and application layers never touch.

pub mod blob;
pub mod bus;
pub mod cluster;
pub mod config;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod persistence;
pub mod sandbox;

pub use blob::FilesystemBlobStore;
pub use bus::{NatsAckHandle, NatsEventPublisher, NatsMessageConsumer};
pub use cluster::KubernetesJobManager;
pub use config::EngineConfig;
pub use llm::HttpLlmProvider;
pub use persistence::SeaOrmHistoryRepository;
pub use sandbox::ProcessSandboxExecutor;
