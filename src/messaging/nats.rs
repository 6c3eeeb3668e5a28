use async_nats::jetstream;
use async_trait::async_trait;

use crate::config::NatsConfig;
use crate::error::{BridgeError, Result};

/// Destination for serialized events.
///
/// Implementations are shared by every delivery worker and must be safe to
/// call concurrently.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()>;
}

/// Long-lived JetStream publish handle.
///
/// `async_nats::Client` and the JetStream context multiplex every caller over
/// one connection and are safe to share, so clones of this handle publish in
/// parallel without extra locking. Create it once at startup.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsPublisher {
    /// Connect to the broker and make sure the target stream captures the subject
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        tracing::info!(url = %config.url, name = %config.connection_name, "Connecting to NATS...");

        let client = async_nats::ConnectOptions::new()
            .name(&config.connection_name)
            .connect(config.url.as_str())
            .await
            .map_err(|e| BridgeError::Connect {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;

        let jetstream = jetstream::new(client.clone());

        jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: config.stream.clone(),
                subjects: vec![config.subject.clone()],
                ..Default::default()
            })
            .await
            .map_err(|e| BridgeError::Stream {
                stream: config.stream.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            stream = %config.stream,
            subject = %config.subject,
            "✅ Connected to NATS JetStream"
        );

        Ok(Self { client, jetstream })
    }

    pub fn connection_state(&self) -> String {
        format!("{:?}", self.client.connection_state())
    }

    /// Flush buffered messages, used on shutdown
    pub async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| BridgeError::publish("<flush>", e))
    }
}

#[async_trait]
impl EventSink for NatsPublisher {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        let ack = self
            .jetstream
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BridgeError::publish(subject, e))?;

        ack.await.map_err(|e| BridgeError::publish(subject, e))?;
        tracing::debug!(subject = %subject, "Published to NATS JetStream");
        Ok(())
    }
}
