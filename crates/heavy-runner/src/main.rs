//! Container entrypoint for the heavy execution path (C6): the image
//! Kubernetes runs as the pod's single container.
//!
//! Grounded on `original_source/src/llm_executor/job_runner/runner.py`'s
//! `main`: read `CODE`/`REQUEST_ID`/`TIMEOUT` from the environment the Job
//! spec injected, run the code, upload the result, emit a completion
//! event, exit non-zero only when the run itself failed - upload and
//! event-emission failures are logged and swallowed, matching the
//! original's "don't raise" comment on `emit_completion_event`.

use std::process::ExitCode;
use std::time::Duration;

use dispatch_domain::entities::{ExecutionResult, ExecutionStatus};
use dispatch_domain::error::{Error, Result};
use dispatch_domain::ports::{BlobStore, EventPublisher, SandboxExecutor};
use dispatch_infrastructure::{EngineConfig, FilesystemBlobStore, NatsEventPublisher, ProcessSandboxExecutor};
use tracing::{error, info, warn};

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::config(format!("required environment variable {name} is not set")))
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match EngineConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = dispatch_infrastructure::logging::init(&config.log_level, &config.log_dir);

    match run(&config).await {
        Ok(status) if status == ExecutionStatus::Success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %err, "heavy job runner failed before completing execution");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &EngineConfig) -> Result<ExecutionStatus> {
    let code = required_env("CODE")?;
    let request_id = required_env("REQUEST_ID")?;
    let timeout_seconds = std::env::var("TIMEOUT")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(config.execution_timeout_seconds);

    info!(request_id, timeout_seconds, code_length = code.len(), "heavy job runner started");

    let sandbox = ProcessSandboxExecutor::new(config.python_interpreter.clone());
    let result = sandbox.execute(&code, &request_id, timeout_seconds).await.unwrap_or_else(|err| {
        error!(request_id, error = %err, "sandbox execution raised an error rather than completing");
        ExecutionResult {
            request_id: request_id.clone(),
            stdout: String::new(),
            stderr: format!("execution error: {err}"),
            exit_code: -1,
            duration_ms: 0,
            status: ExecutionStatus::Failed,
        }
    });

    info!(request_id, status = ?result.status, exit_code = result.exit_code, duration_ms = result.duration_ms, "code execution completed");

    let result_location = upload_result(&request_id, &result, config).await;
    emit_completion_event(&result, &result_location, config).await;

    Ok(result.status)
}

async fn upload_result(request_id: &str, result: &ExecutionResult, config: &EngineConfig) -> String {
    let blob = FilesystemBlobStore::new(config.storage_root.clone());
    let name = format!("{request_id}.json");

    let payload = match serde_json::to_vec_pretty(result) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(request_id, error = %err, "failed to serialize execution result, result will not be uploaded");
            return "local://not-uploaded".to_string();
        }
    };

    match blob.put(&config.storage_container, &name, payload).await {
        Ok(location) => {
            info!(request_id, location, "uploaded execution result");
            location
        }
        Err(err) => {
            error!(request_id, error = %err, "failed to upload execution result, continuing without it");
            "local://not-uploaded".to_string()
        }
    }
}

async fn emit_completion_event(result: &ExecutionResult, result_location: &str, config: &EngineConfig) {
    let publisher = match NatsEventPublisher::connect(&config.nats_url).await {
        Ok(publisher) => publisher,
        Err(err) => {
            warn!(error = %err, "could not connect to the message bus, skipping completion event");
            return;
        }
    };

    let payload = serde_json::json!({
        "requestId": result.request_id,
        "status": result.status,
        "resultLocation": result_location,
        "durationMs": result.duration_ms,
        "exitCode": result.exit_code,
        "timestamp": chrono::Utc::now().timestamp_millis(),
    });

    if let Err(err) = publisher.publish(&config.nats_results_subject, payload).await {
        warn!(request_id = result.request_id, error = %err, "failed to emit completion event");
    } else {
        info!(request_id = result.request_id, "completion event emitted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_env_reports_missing_variables_as_config_errors() {
        std::env::remove_var("HEAVY_RUNNER_TEST_VAR_THAT_DOES_NOT_EXIST");
        let err = required_env("HEAVY_RUNNER_TEST_VAR_THAT_DOES_NOT_EXIST").unwrap_err();
        assert!(err.to_string().contains("HEAVY_RUNNER_TEST_VAR_THAT_DOES_NOT_EXIST"));
    }

    #[tokio::test]
    async fn upload_result_writes_through_the_filesystem_blob_store() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let mut config = EngineConfig::default();
        config.storage_root = temp_dir.path().to_string_lossy().into_owned();

        let result = ExecutionResult {
            request_id: "req-heavy-1".to_string(),
            stdout: "done\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 10,
            status: ExecutionStatus::Success,
        };

        let location = upload_result("req-heavy-1", &result, &config).await;
        assert!(location.starts_with("file://"));

        let path = temp_dir.path().join(&config.storage_container).join("req-heavy-1.json");
        assert!(path.exists());
    }
}
