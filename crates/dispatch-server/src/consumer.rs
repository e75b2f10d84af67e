//! Async message-bus consumer supervisor (C9): drains code-execution
//! requests off the bus, validates and classifies them, and hands them to
//! the same sandbox/cluster dispatch path the HTTP surface uses.
//!
//! Grounded on
//! `original_source/src/llm_executor/executor_service/event_hub_consumer.py`'s
//! `EventHubConsumer.run`: a bounded worker pool processes deliveries
//! concurrently, and a message is acknowledged only once it has been
//! routed to a dispatch path - never once that dispatch has actually
//! finished, since a crash after routing is recovered from `job_history`,
//! not redelivery.

use crate::handlers;
use crate::state::AppState;
use dispatch_domain::entities::ExecutionStatus;
use dispatch_domain::ports::MessageConsumer;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Runs the consume loop until the bus closes its subscription. Intended to
/// be spawned as a background task alongside the HTTP server.
pub async fn run_consumer(consumer: Arc<dyn MessageConsumer>, state: AppState, concurrency: usize) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    loop {
        let delivery = match consumer.receive().await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                info!("message bus subscription closed, stopping consumer");
                return;
            }
            Err(err) => {
                error!(error = %err, "failed to receive from message bus, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        let permit = Arc::clone(&semaphore).acquire_owned().await.expect("semaphore is never closed");
        let state = state.clone();
        let (request, ack) = delivery;

        tokio::spawn(async move {
            let _permit = permit;
            route_and_ack(state, request, ack).await;
        });
    }
}

async fn route_and_ack(
    state: AppState,
    request: dispatch_domain::entities::CodeExecutionRequest,
    ack: Box<dyn dispatch_domain::ports::AckHandle>,
) {
    let request_id = request.request_id.clone();

    let verdict = match state.validator.validate(&request.code) {
        Ok(verdict) => verdict,
        Err(err) => {
            error!(request_id, error = %err, "validation raised an error for a bus-delivered request, leaving unacknowledged for redelivery");
            handlers::persist_history(&state, &request_id, ExecutionStatus::Error, None, 0, None).await;
            return;
        }
    };

    if !verdict.is_allowed() {
        warn!(request_id, findings = verdict.findings.len(), "bus-delivered request rejected by validation");
        handlers::persist_history(&state, &request_id, ExecutionStatus::Rejected, None, 0, None).await;
        publish_rejection(&state, &request_id, &verdict).await;
        if let Err(err) = ack.ack().await {
            warn!(request_id, error = %err, "failed to ack after rejection");
        }
        return;
    }

    let tag = dispatch_validate::classify_source(&request.code);
    let timeout = request.timeout.unwrap_or(state.config.execution_timeout_seconds);

    handlers::spawn_dispatch(state.clone(), request_id.clone(), request.code.clone(), Some(tag), timeout);

    if let Err(err) = ack.ack().await {
        warn!(request_id, error = %err, "failed to ack after routing; bus will redeliver");
    } else {
        info!(request_id, ?tag, "bus-delivered request routed and acknowledged");
    }
}

async fn publish_rejection(state: &AppState, request_id: &str, verdict: &dispatch_domain::entities::ValidationVerdict) {
    let payload = serde_json::json!({
        "requestId": request_id,
        "status": "rejected",
        "findings": verdict.findings,
    });

    if let Err(err) = state.publisher.publish(&state.config.nats_results_subject, payload).await {
        warn!(request_id, error = %err, "failed to publish rejection event");
    }
}
