use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::config::EventFormat;
use crate::domain::observation::{self, Observation};
use crate::domain::OperationKind;
use crate::error::{BridgeError, Result};
use crate::messaging::{codec, EventSink};
use crate::metrics::Metrics;

// ============================================================================
// Observation Publisher
// ============================================================================
//
// map → encode → publish for one observation change. Every failure is logged
// and folded into a PublishOutcome; nothing propagates to the caller and
// nothing is retried.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Serialization,
    Publish,
    /// Circuit breaker open; the broker was not contacted
    CircuitOpen,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Serialization => "serialization",
            DropReason::Publish => "publish",
            DropReason::CircuitOpen => "circuit_open",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// Operation kind produces no event
    Ignored,
    Dropped(DropReason),
}

pub struct ObservationPublisher {
    sink: Arc<dyn EventSink>,
    subject: String,
    format: EventFormat,
    metrics: Arc<Metrics>,
}

impl ObservationPublisher {
    pub fn new(
        sink: Arc<dyn EventSink>,
        subject: impl Into<String>,
        format: EventFormat,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            sink,
            subject: subject.into(),
            format,
            metrics,
        }
    }

    /// Publish one observation change. `raw` is the resource as received,
    /// used by the passthrough format.
    pub async fn publish(
        &self,
        obs: &Observation,
        raw: &Value,
        operation: OperationKind,
    ) -> PublishOutcome {
        let op = operation.as_str();

        let Some((observation_id, encoded)) = self.encode(obs, raw, operation) else {
            tracing::debug!(op = %op, "Operation produces no observation event");
            self.metrics.record_ignored(op);
            return PublishOutcome::Ignored;
        };

        self.send(op, &observation_id, encoded).await
    }

    /// Hand an encoded event to the sink and fold the result into an outcome
    async fn send(
        &self,
        op: &str,
        observation_id: &str,
        encoded: Result<Vec<u8>>,
    ) -> PublishOutcome {
        let payload = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    subject = %self.subject,
                    op = %op,
                    observation_id = %observation_id,
                    "Event serialization failed, dropping event"
                );
                self.metrics.record_dropped(op, DropReason::Serialization.as_str());
                return PublishOutcome::Dropped(DropReason::Serialization);
            }
        };

        let started = Instant::now();
        match self.sink.publish(&self.subject, payload).await {
            Ok(()) => {
                tracing::info!(
                    subject = %self.subject,
                    op = %op,
                    observation_id = %observation_id,
                    "📤 Published observation event"
                );
                self.metrics.record_published(op, started.elapsed().as_secs_f64());
                PublishOutcome::Published
            }
            Err(e) => {
                let reason = match &e {
                    BridgeError::CircuitOpen(_) => DropReason::CircuitOpen,
                    _ => DropReason::Publish,
                };
                tracing::error!(
                    error = %e,
                    subject = %self.subject,
                    op = %op,
                    observation_id = %observation_id,
                    reason = reason.as_str(),
                    "❌ Publish failed, dropping event"
                );
                self.metrics.record_dropped(op, reason.as_str());
                PublishOutcome::Dropped(reason)
            }
        }
    }

    fn encode(
        &self,
        obs: &Observation,
        raw: &Value,
        operation: OperationKind,
    ) -> Option<(String, Result<Vec<u8>>)> {
        match self.format {
            EventFormat::Canonical => {
                let event = observation::map(obs, operation)?;
                let encoded = codec::encode(&event);
                Some((event.observation_id().to_string(), encoded))
            }
            EventFormat::Passthrough => match operation {
                OperationKind::Create | OperationKind::Update | OperationKind::Delete => Some((
                    observation::extractors::observation_id(obs),
                    codec::encode_passthrough(raw, operation),
                )),
                _ => None,
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn raw_observation() -> Value {
        json!({
            "resourceType": "Observation",
            "id": "obs-1",
            "subject": { "reference": "Patient/123" },
            "code": { "coding": [{ "system": "http://loinc.org", "code": "8310-5" }] },
            "effectivePeriod": { "start": "2024-01-01T00:00Z" },
            "valueQuantity": { "value": 98.6, "unit": "°F" }
        })
    }

    fn publisher(sink: Arc<dyn EventSink>, format: EventFormat) -> (ObservationPublisher, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        (
            ObservationPublisher::new(sink, "fhir.observation", format, metrics.clone()),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_create_is_published_to_subject() {
        let sink = Arc::new(RecordingSink::default());
        let (publisher, _) = publisher(sink.clone(), EventFormat::Canonical);
        let raw = raw_observation();
        let obs: Observation = serde_json::from_value(raw.clone()).unwrap();

        let outcome = publisher.publish(&obs, &raw, OperationKind::Create).await;

        assert_eq!(outcome, PublishOutcome::Published);
        let published = sink.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "fhir.observation");
        let event: Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(event["op"], "create");
        assert_eq!(event["valueText"], "98.6 °F");
        assert_eq!(event["effectiveEnd"], "unknown");
    }

    #[tokio::test]
    async fn test_unsupported_operation_is_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let (publisher, _) = publisher(sink.clone(), EventFormat::Canonical);
        let raw = raw_observation();
        let obs: Observation = serde_json::from_value(raw.clone()).unwrap();

        let outcome = publisher
            .publish(&obs, &raw, OperationKind::ManuallyTriggered)
            .await;

        assert_eq!(outcome, PublishOutcome::Ignored);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_publish_failures_are_dropped_once_per_attempt() {
        let sink = Arc::new(FailingSink::default());
        let (publisher, metrics) = publisher(sink.clone(), EventFormat::Canonical);
        let raw = raw_observation();
        let obs: Observation = serde_json::from_value(raw.clone()).unwrap();

        for op in [OperationKind::Create, OperationKind::Update, OperationKind::Delete] {
            let outcome = publisher.publish(&obs, &raw, op).await;
            assert_eq!(outcome, PublishOutcome::Dropped(DropReason::Publish));
        }

        assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(dropped_count(&metrics, "publish"), 3);
    }

    #[tokio::test]
    async fn test_passthrough_format() {
        let sink = Arc::new(RecordingSink::default());
        let (publisher, _) = publisher(sink.clone(), EventFormat::Passthrough);
        let raw = raw_observation();
        let obs: Observation = serde_json::from_value(raw.clone()).unwrap();

        let outcome = publisher.publish(&obs, &raw, OperationKind::Delete).await;

        assert_eq!(outcome, PublishOutcome::Published);
        let payloads = sink.payloads();
        assert_eq!(payloads[0]["op"], "delete");
        let body: Value =
            serde_json::from_str(payloads[0]["observation"].as_str().unwrap()).unwrap();
        assert_eq!(body, raw);
    }

    #[tokio::test]
    async fn test_passthrough_ignores_other_operations() {
        let sink = Arc::new(RecordingSink::default());
        let (publisher, _) = publisher(sink.clone(), EventFormat::Passthrough);
        let raw = raw_observation();
        let obs: Observation = serde_json::from_value(raw.clone()).unwrap();

        let outcome = publisher.publish(&obs, &raw, OperationKind::Transaction).await;
        assert_eq!(outcome, PublishOutcome::Ignored);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_serialization_failure_is_dropped_without_publish() {
        let sink = Arc::new(RecordingSink::default());
        let (publisher, metrics) = publisher(sink.clone(), EventFormat::Canonical);
        let serde_err = serde_json::from_str::<Value>("{").unwrap_err();

        let outcome = publisher
            .send("create", "obs-1", Err(BridgeError::Serialization(serde_err)))
            .await;

        assert_eq!(outcome, PublishOutcome::Dropped(DropReason::Serialization));
        assert_eq!(sink.count(), 0);
        assert_eq!(dropped_count(&metrics, "serialization"), 1);
    }

    #[tokio::test]
    async fn test_oversized_quantity_still_published() {
        let sink = Arc::new(RecordingSink::default());
        let (publisher, _) = publisher(sink.clone(), EventFormat::Canonical);
        let raw: Value = serde_json::from_str(
            r#"{"resourceType":"Observation","id":"o","valueQuantity":{"value":123456789012345678901234567890,"unit":"mg"}}"#,
        )
        .unwrap();
        let obs: Observation = serde_json::from_value(raw.clone()).unwrap();

        let outcome = publisher.publish(&obs, &raw, OperationKind::Create).await;

        assert_eq!(outcome, PublishOutcome::Published);
        assert_eq!(
            sink.payloads()[0]["valueText"],
            "123456789012345678901234567890 mg"
        );
    }
}
