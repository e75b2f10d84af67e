//! Async message-bus surface (C9's transport): a NATS JetStream consumer
//! and publisher.
//!
//! Grounded on `mcb-infrastructure`'s `infrastructure::events_nats::NatsEventBus`
//! for connection setup and error mapping, and on
//! `original_source/src/llm_executor/executor_service/event_hub_consumer.py`'s
//! `EventHubConsumer` for the consume-loop contract this module must
//! satisfy: a message is never acknowledged until the caller has finished
//! routing it, so a crash mid-processing redelivers rather than losing the
//! request. This replaces the original's Azure Event Hub with the
//! teacher's own `async-nats` dependency - Event Hub has no Rust SDK in
//! this workspace's stack, and the spec already treats the bus as an
//! abstract durable message bus.

use async_trait::async_trait;
use dispatch_domain::entities::CodeExecutionRequest;
use dispatch_domain::error::{Error, Result};
use dispatch_domain::ports::{AckHandle, EventPublisher, MessageConsumer};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Pull-based JetStream consumer of code-execution-request messages.
pub struct NatsMessageConsumer {
    messages: Mutex<async_nats::jetstream::consumer::pull::Stream>,
}

impl NatsMessageConsumer {
    /// Connect to `url`, ensure the durable stream `stream_name` exists
    /// bound to `subject`, and create (or reuse) a durable pull consumer
    /// named `consumer_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, stream, or consumer cannot be
    /// established.
    pub async fn connect(url: &str, subject: &str, stream_name: &str, consumer_name: &str) -> Result<Self> {
        info!(url, subject, stream_name, "connecting to NATS JetStream");

        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::network_with_source(format!("failed to connect to NATS server at {url}"), e))?;
        let jetstream = async_nats::jetstream::new(client);

        let stream = jetstream
            .get_or_create_stream(async_nats::jetstream::stream::Config {
                name: stream_name.to_string(),
                subjects: vec![subject.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|e| Error::network_with_source(format!("failed to ensure JetStream stream '{stream_name}'"), e))?;

        let consumer: async_nats::jetstream::consumer::PullConsumer = stream
            .get_or_create_consumer(
                consumer_name,
                async_nats::jetstream::consumer::pull::Config {
                    durable_name: Some(consumer_name.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| Error::network_with_source(format!("failed to ensure JetStream consumer '{consumer_name}'"), e))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| Error::network_with_source("failed to open JetStream message stream", e))?;

        Ok(Self { messages: Mutex::new(messages) })
    }
}

#[async_trait]
impl MessageConsumer for NatsMessageConsumer {
    async fn receive(&self) -> Result<Option<(CodeExecutionRequest, Box<dyn AckHandle>)>> {
        let mut messages = self.messages.lock().await;
        let Some(delivery) = messages.next().await else {
            return Ok(None);
        };

        let message = delivery.map_err(|e| Error::network_with_source("JetStream delivery error", e))?;

        let request: CodeExecutionRequest = match serde_json::from_slice(&message.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "message payload failed to parse, leaving unacknowledged for redelivery");
                return Err(Error::message_parse(format!("invalid code-execution-request payload: {e}")));
            }
        };

        debug!(request_id = %request.request_id, "received code-execution-request");
        Ok(Some((request, Box::new(NatsAckHandle { message }))))
    }
}

/// A pending JetStream acknowledgement, held until the routed request has
/// been fully dispatched.
pub struct NatsAckHandle {
    message: async_nats::jetstream::Message,
}

#[async_trait]
impl AckHandle for NatsAckHandle {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.message.ack().await.map_err(|e| Error::network(format!("failed to ack JetStream message: {e}")))
    }
}

/// Publishes completion and notification events to arbitrary subjects.
pub struct NatsEventPublisher {
    client: async_nats::Client,
}

impl NatsEventPublisher {
    /// Connect a plain core-NATS client for publishing. Publishing uses
    /// fire-and-forget core NATS rather than JetStream, matching the
    /// original's `emit_completion_event` treating publish failures as
    /// non-fatal to the job.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::network_with_source(format!("failed to connect to NATS server at {url}"), e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        let bytes = serde_json::to_vec(&payload)?;
        self.client.publish(topic.to_string(), bytes.into()).await.map_err(|e| {
            error!(topic, error = %e, "failed to publish event");
            Error::network(format!("failed to publish to subject '{topic}': {e}"))
        })?;
        self.client.flush().await.map_err(|e| Error::network(format!("failed to flush NATS client: {e}")))?;
        Ok(())
    }
}
