//! Error handling types.
//!
//! Variants map directly onto the error kinds the orchestration, sandbox,
//! cluster-job, and persistence components are specified to produce. This
//! is not a generic grab-bag: a new failure mode in a collaborator should
//! be folded into the closest existing variant rather than growing the
//! enum, unless it drives genuinely distinct caller behavior (e.g. retry
//! eligibility).

use thiserror::Error;

/// Result type alias for operations that can fail.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the code dispatch engine.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// JSON parsing or serialization error.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// UTF-8 decoding error, e.g. on captured process output.
    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Generic error from an external source with no closer-fitting variant.
    #[error("{0}")]
    Generic(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// A requested resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found.
        resource: String,
    },

    /// A caller-supplied argument failed a precondition check.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A required configuration key was absent.
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// A configuration value was present but invalid.
    #[error("Invalid configuration for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key that is invalid.
        key: String,
        /// Reason why it is invalid.
        message: String,
    },

    /// An internal invariant was violated; not attributable to caller input.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// Source code failed to parse into a syntax tree.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of why the source could not be parsed.
        message: String,
    },

    /// A security or complexity rule rejected the submitted code.
    #[error("Validation error: {message}")]
    Validation {
        /// The rule name and reason the code was rejected.
        message: String,
    },

    /// The sandboxed process, or the monitored cluster job, exceeded its
    /// timeout.
    #[error("Execution timed out after {timeout_seconds}s")]
    Timeout {
        /// The timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// The sandbox could not run the submitted program at all (distinct
    /// from a program that ran and exited non-zero, which is a normal
    /// `ExecutionOutcome`, not an `Error`).
    #[error("Sandbox execution failed: {message}")]
    SandboxFailure {
        /// Description of the failure.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A resource was momentarily unavailable; the caller may retry.
    #[error("Transient resource error: {message}")]
    TransientResource {
        /// Description of the transient condition.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A network-level failure occurred while calling a collaborator
    /// (LLM provider, cluster API, message bus).
    #[error("Network error: {message}")]
    Network {
        /// Description of the network failure.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The cluster job orchestrator API rejected or failed a request.
    #[error("Orchestrator API error: {message}")]
    OrchestratorApi {
        /// Description of the orchestrator failure.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A message-bus payload could not be decoded into a known request.
    #[error("Message parse error: {message}")]
    MessageParse {
        /// Description of the parse failure.
        message: String,
    },

    /// A persistence operation failed.
    #[error("Persistence error: {message}")]
    Persistence {
        /// Description of the persistence failure.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a generic error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into().into())
    }

    /// Create a not-found error.
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Create a parse error.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse { message: message.into() }
    }

    /// Create a validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Create a sandbox failure error.
    pub fn sandbox_failure<S: Into<String>>(message: S) -> Self {
        Self::SandboxFailure { message: message.into(), source: None }
    }

    /// Create a sandbox failure error with a source.
    pub fn sandbox_failure_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SandboxFailure { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a transient-resource error.
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::TransientResource { message: message.into(), source: None }
    }

    /// Create a transient-resource error with a source.
    pub fn transient_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TransientResource { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a network error.
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network { message: message.into(), source: None }
    }

    /// Create a network error with a source.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create an orchestrator API error.
    pub fn orchestrator_api<S: Into<String>>(message: S) -> Self {
        Self::OrchestratorApi { message: message.into(), source: None }
    }

    /// Create an orchestrator API error with a source.
    pub fn orchestrator_api_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::OrchestratorApi { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a message-parse error.
    pub fn message_parse<S: Into<String>>(message: S) -> Self {
        Self::MessageParse { message: message.into() }
    }

    /// Create a persistence error.
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence { message: message.into(), source: None }
    }

    /// Create a persistence error with a source.
    pub fn persistence_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Whether a failed attempt at code execution should be retried by the
    /// retry coordinator.
    ///
    /// Timeouts and sandbox failures that already ran to completion are not
    /// retried - retrying would reproduce the same outcome. Only conditions
    /// that prevented the attempt from running at all (the process could
    /// not be spawned, a dependency was briefly unreachable) are
    /// retryable. Unknown error kinds default to non-retryable, per the
    /// error taxonomy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientResource { .. } | Self::Network { .. })
    }
}
