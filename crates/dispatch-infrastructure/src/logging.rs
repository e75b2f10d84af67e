//! Wires `tracing`/`tracing-subscriber` into the process and registers the
//! domain-layer logging facade (`dispatch_domain::infra::logging`) so that
//! `dispatch-domain` and `dispatch-application` can log without depending
//! on `tracing` themselves.

use dispatch_domain::ports::LogLevel;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber with an env-filter and JSON
/// output, and registers [`log_via_tracing`] as the domain facade's sink.
///
/// Returns the [`WorkerGuard`] for the non-blocking file appender; the
/// caller must keep it alive for the process lifetime or buffered log
/// lines are dropped on exit.
pub fn init(log_level: &str, log_dir: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "dispatch-engine.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(non_blocking)
        .with_current_span(true)
        .with_span_list(true)
        .init();

    dispatch_domain::infra::logging::set_log_fn(log_via_tracing);
    guard
}

fn log_via_tracing(level: LogLevel, context: &str, message: &str, detail: Option<&dyn std::fmt::Display>) {
    match (level, detail) {
        (LogLevel::Trace, Some(d)) => tracing::trace!(context, %d, "{message}"),
        (LogLevel::Trace, None) => tracing::trace!(context, "{message}"),
        (LogLevel::Debug, Some(d)) => tracing::debug!(context, %d, "{message}"),
        (LogLevel::Debug, None) => tracing::debug!(context, "{message}"),
        (LogLevel::Info, Some(d)) => tracing::info!(context, %d, "{message}"),
        (LogLevel::Info, None) => tracing::info!(context, "{message}"),
        (LogLevel::Warn, Some(d)) => tracing::warn!(context, %d, "{message}"),
        (LogLevel::Warn, None) => tracing::warn!(context, "{message}"),
        (LogLevel::Error, Some(d)) => tracing::error!(context, %d, "{message}"),
        (LogLevel::Error, None) => tracing::error!(context, "{message}"),
    }
}
