//! Sandbox executor (C4): runs approved lightweight programs in a scrubbed
//! child process.
//!
//! Grounded on
//! `original_source/src/llm_executor/executor_service/secure_executor.py`'s
//! `SecureExecutor`. The Python original relies on `subprocess.run`'s
//! timeout exception to carry partial output; Rust's `tokio::process`
//! has no equivalent, so partial stdout/stderr is instead captured by
//! reading the child's piped handles via spawned reader tasks that survive
//! the `kill()` call.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use dispatch_domain::entities::{ExecutionResult, ExecutionStatus};
use dispatch_domain::error::{Error, Result};
use dispatch_domain::ports::SandboxExecutor;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Executes Python source in a fresh, scrubbed child process per attempt.
pub struct ProcessSandboxExecutor {
    interpreter: String,
}

impl ProcessSandboxExecutor {
    /// `interpreter` is the resolved Python binary, e.g. `python3`.
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self { interpreter: interpreter.into() }
    }
}

#[async_trait]
impl SandboxExecutor for ProcessSandboxExecutor {
    async fn execute(&self, code: &str, request_id: &str, timeout_seconds: u64) -> Result<ExecutionResult> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("exec_{request_id}_"))
            .tempdir()
            .map_err(|e| Error::sandbox_failure_with_source("failed to create temp directory", e))?;

        info!(request_id, timeout_seconds, code_length = code.len(), "starting sandbox execution");

        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(code)
            .current_dir(temp_dir.path())
            .env_clear()
            .env("PYTHONHASHSEED", "0")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::sandbox_failure_with_source("failed to spawn interpreter", e))?;

        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let start = Instant::now();
        let wait_result = tokio::time::timeout(
            std::time::Duration::from_secs(timeout_seconds),
            child.wait(),
        )
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match wait_result {
            Ok(Ok(status)) => {
                let stdout = collect_output(stdout_task).await;
                let stderr = collect_output(stderr_task).await;
                let exit_code = status.code().unwrap_or(-1);
                let status = if exit_code == 0 { ExecutionStatus::Success } else { ExecutionStatus::Failed };
                info!(request_id, ?status, exit_code, duration_ms, "sandbox execution completed");
                ExecutionResult {
                    request_id: request_id.to_string(),
                    stdout,
                    stderr,
                    exit_code,
                    duration_ms,
                    status,
                }
            }
            Ok(Err(e)) => {
                return Err(Error::sandbox_failure_with_source("failed to wait for child process", e));
            }
            Err(_elapsed) => {
                warn!(request_id, timeout_seconds, duration_ms, "sandbox execution timed out");
                if let Err(e) = child.start_kill() {
                    error!(request_id, error = %e, "failed to kill timed-out child");
                }
                let _ = child.wait().await;
                let stdout = collect_output(stdout_task).await;
                let mut stderr = collect_output(stderr_task).await;
                stderr.push_str(&format!("\nExecution timed out after {timeout_seconds} seconds"));
                ExecutionResult {
                    request_id: request_id.to_string(),
                    stdout,
                    stderr,
                    exit_code: -1,
                    duration_ms,
                    status: ExecutionStatus::Timeout,
                }
            }
        };

        if let Err(e) = temp_dir.close() {
            error!(request_id, error = %e, "failed to clean up temp directory");
        }

        Ok(result)
    }
}

async fn collect_output(task: tokio::task::JoinHandle<Vec<u8>>) -> String {
    match task.await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_python3() -> bool {
        std::process::Command::new("python3").arg("--version").output().is_ok()
    }

    #[tokio::test]
    async fn successful_program_reports_stdout_and_exit_zero() {
        if !has_python3() {
            return;
        }
        let executor = ProcessSandboxExecutor::new("python3");
        let result = executor.execute("print('hello')", "r1", 5).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_as_failed_not_error() {
        if !has_python3() {
            return;
        }
        let executor = ProcessSandboxExecutor::new("python3");
        let result = executor.execute("import sys; sys.exit(7)", "r2", 5).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.exit_code, 7);
    }

    #[tokio::test]
    async fn long_running_program_is_terminated_at_timeout() {
        if !has_python3() {
            return;
        }
        let executor = ProcessSandboxExecutor::new("python3");
        let result = executor.execute("import time; time.sleep(10)", "r3", 1).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("timed out"));
    }

    #[tokio::test]
    async fn partial_output_survives_timeout_kill() {
        if !has_python3() {
            return;
        }
        let executor = ProcessSandboxExecutor::new("python3");
        let code = "import sys, time\nprint('before-sleep')\nsys.stdout.flush()\ntime.sleep(10)\n";
        let result = executor.execute(code, "r4", 1).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(result.stdout.contains("before-sleep"));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_sandbox_failure_not_a_panic() {
        let executor = ProcessSandboxExecutor::new("this-interpreter-does-not-exist");
        let result = executor.execute("print(1)", "r5", 5).await;
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_retryable());
    }
}
