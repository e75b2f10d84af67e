//! Retry coordinator (C5): wraps a sandbox execution attempt with a bounded
//! number of retries and exponential backoff.
//!
//! Grounded on the original `ExecutionErrorHandler`/`RetryWrapper` pair:
//! only an `Err` from the wrapped attempt itself (the process could not be
//! spawned at all) drives the retry loop. A completed attempt - whether it
//! timed out or exited non-zero - is a terminal `ExecutionResult`, never
//! retried.

use dispatch_domain::entities::{ExecutionResult, ExecutionStatus};
use dispatch_domain::error::Error;
use dispatch_domain::ports::SandboxExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Coordinates retries over a [`SandboxExecutor`] attempt.
pub struct RetryCoordinator {
    executor: Arc<dyn SandboxExecutor>,
    max_retries: u32,
}

impl RetryCoordinator {
    /// `max_retries` additional attempts are allowed after the initial one.
    pub fn new(executor: Arc<dyn SandboxExecutor>, max_retries: u32) -> Self {
        Self { executor, max_retries }
    }

    /// Backoff delay before the attempt following `attempt` (0-indexed
    /// among retries): `min(2^attempt, 60)` seconds.
    pub fn backoff(attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt).min(60))
    }

    /// Execute `code`, retrying spawn-level failures up to `max_retries`
    /// times. Always returns a result - exhaustion synthesizes a failed
    /// outcome rather than propagating an error, since the caller persists
    /// and reports on an `ExecutionResult` either way.
    pub async fn execute_with_retry(
        &self,
        code: &str,
        request_id: &str,
        timeout_seconds: u64,
    ) -> ExecutionResult {
        let mut attempt = 0u32;
        let mut error_history: Vec<String> = Vec::new();

        loop {
            match self.executor.execute(code, request_id, timeout_seconds).await {
                Ok(result) => {
                    if attempt > 0 && result.status == ExecutionStatus::Success {
                        info!(request_id, attempts = attempt + 1, "execution succeeded after retry");
                    }
                    return result;
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    warn!(request_id, attempt, retryable, error = %err, "execution attempt failed");
                    error_history.push(format!("Attempt {}:\n  Error: {err}", attempt + 1));

                    if !retryable || attempt >= self.max_retries {
                        return Self::exhausted(request_id, &error_history);
                    }

                    tokio::time::sleep(Self::backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    fn exhausted(request_id: &str, history: &[String]) -> ExecutionResult {
        let mut stderr = String::from("Execution failed after multiple attempts:\n");
        stderr.push_str(&history.join("\n"));
        ExecutionResult {
            request_id: request_id.to_string(),
            stdout: String::new(),
            stderr,
            exit_code: -1,
            duration_ms: 0,
            status: ExecutionStatus::Failed,
        }
    }
}

/// Classify a [`dispatch_domain::error::Error`] into the disposition the
/// retry coordinator cares about. Exposed so callers assembling concrete
/// `SandboxExecutor::execute` errors can reuse the same taxonomy the
/// coordinator itself trusts.
pub fn is_retryable(error: &Error) -> bool {
    error.is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dispatch_domain::error::Result;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedExecutor {
        responses: Mutex<Vec<Result<ExecutionResult>>>,
        calls: AtomicU32,
    }

    impl ScriptedExecutor {
        fn new(mut responses: Vec<Result<ExecutionResult>>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), calls: AtomicU32::new(0) }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SandboxExecutor for ScriptedExecutor {
        async fn execute(&self, _code: &str, request_id: &str, _timeout_seconds: u64) -> Result<ExecutionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            match responses.pop() {
                Some(Ok(mut r)) => {
                    r.request_id = request_id.to_string();
                    Ok(r)
                }
                Some(Err(e)) => Err(e),
                None => panic!("ScriptedExecutor called more times than scripted"),
            }
        }
    }

    fn success() -> ExecutionResult {
        ExecutionResult {
            request_id: String::new(),
            stdout: "ok".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 5,
            status: ExecutionStatus::Success,
        }
    }

    fn timeout() -> ExecutionResult {
        ExecutionResult {
            request_id: String::new(),
            stdout: String::new(),
            stderr: "Execution timed out after 1 seconds".to_string(),
            exit_code: -1,
            duration_ms: 1000,
            status: ExecutionStatus::Timeout,
        }
    }

    #[tokio::test]
    async fn successful_attempt_is_not_retried() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(success())]));
        let coordinator = RetryCoordinator::new(executor.clone(), 3);
        let result = coordinator.execute_with_retry("print(1)", "r1", 30).await;
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn timeout_outcome_is_terminal_not_retried() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(timeout())]));
        let coordinator = RetryCoordinator::new(executor.clone(), 3);
        let result = coordinator.execute_with_retry("print(1)", "r1", 1).await;
        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_spawn_failure_retries_until_success() {
        let executor = Arc::new(ScriptedExecutor::new(vec![
            Err(Error::transient("resource exhausted")),
            Err(Error::transient("resource exhausted")),
            Ok(success()),
        ]));
        let coordinator = RetryCoordinator::new(executor.clone(), 3);
        let result = coordinator.execute_with_retry("print(1)", "r1", 30).await;
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(executor.call_count(), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_immediately() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Err(Error::sandbox_failure("corrupt state"))]));
        let coordinator = RetryCoordinator::new(executor.clone(), 3);
        let result = coordinator.execute_with_retry("print(1)", "r1", 30).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.exit_code, -1);
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_retries_synthesizes_a_failed_outcome() {
        let executor = Arc::new(ScriptedExecutor::new(vec![
            Err(Error::network("dns failure")),
            Err(Error::network("dns failure")),
        ]));
        let coordinator = RetryCoordinator::new(executor.clone(), 1);
        let result = coordinator.execute_with_retry("print(1)", "r1", 30).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("Attempt 1"));
        assert!(result.stderr.contains("Attempt 2"));
        assert_eq!(executor.call_count(), 2);
    }

    #[test]
    fn backoff_follows_min_two_pow_attempt_sixty() {
        assert_eq!(RetryCoordinator::backoff(0), Duration::from_secs(1));
        assert_eq!(RetryCoordinator::backoff(1), Duration::from_secs(2));
        assert_eq!(RetryCoordinator::backoff(5), Duration::from_secs(32));
        assert_eq!(RetryCoordinator::backoff(6), Duration::from_secs(60));
        assert_eq!(RetryCoordinator::backoff(10), Duration::from_secs(60));
    }
}
