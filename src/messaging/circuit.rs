use async_trait::async_trait;
use std::sync::Arc;

use super::nats::EventSink;
use crate::error::{BridgeError, Result};
use crate::metrics::Metrics;
use crate::utils::{CircuitBreaker, CircuitBreakerError};

/// Wraps a sink with a circuit breaker.
///
/// While the circuit is open the inner sink is not called and the publish
/// fails with `BridgeError::CircuitOpen`. The event is not retried.
pub struct CircuitBreakerSink {
    inner: Arc<dyn EventSink>,
    breaker: CircuitBreaker,
    metrics: Arc<Metrics>,
}

impl CircuitBreakerSink {
    pub fn new(inner: Arc<dyn EventSink>, breaker: CircuitBreaker, metrics: Arc<Metrics>) -> Self {
        Self {
            inner,
            breaker,
            metrics,
        }
    }
}

#[async_trait]
impl EventSink for CircuitBreakerSink {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        let result = self.breaker.call(self.inner.publish(subject, payload)).await;
        self.metrics
            .update_circuit_breaker_state(self.breaker.state().await);

        match result {
            Ok(()) => Ok(()),
            Err(CircuitBreakerError::CircuitOpen) => {
                let retry_in = self.breaker.open_remaining().await.unwrap_or_default();
                tracing::warn!(
                    subject = %subject,
                    retry_in_secs = retry_in.as_secs(),
                    "Circuit open, broker not contacted"
                );
                Err(BridgeError::CircuitOpen(subject.to_string()))
            }
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventFormat;
    use crate::delivery::test_support::{dropped_count, FailingSink, RecordingSink};
    use crate::delivery::{DropReason, ObservationPublisher, PublishOutcome};
    use crate::domain::observation::Observation;
    use crate::domain::OperationKind;
    use crate::utils::{CircuitBreakerConfig, CircuitState};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn breaker(failure_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold,
                timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits_inner_sink() {
        let failing = Arc::new(FailingSink::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let cb = breaker(2);
        let sink = CircuitBreakerSink::new(failing.clone(), cb.clone(), metrics.clone());

        for _ in 0..2 {
            let err = sink.publish("fhir.observation", b"{}".to_vec()).await.unwrap_err();
            assert!(matches!(err, BridgeError::Publish { .. }));
        }
        assert_eq!(cb.state().await, CircuitState::Open);
        assert_eq!(metrics.circuit_breaker_state.get(), 1);

        let err = sink.publish("fhir.observation", b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, BridgeError::CircuitOpen(ref subject) if subject == "fhir.observation"));
        assert_eq!(failing.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_closed_circuit_passes_through() {
        let recording = Arc::new(RecordingSink::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let sink = CircuitBreakerSink::new(recording.clone(), breaker(1), metrics.clone());

        sink.publish("fhir.observation", b"{}".to_vec()).await.unwrap();

        assert_eq!(recording.count(), 1);
        assert_eq!(metrics.circuit_breaker_state.get(), 0);
    }

    #[tokio::test]
    async fn test_open_circuit_drops_each_event_once() {
        let failing = Arc::new(FailingSink::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let sink = Arc::new(CircuitBreakerSink::new(failing.clone(), breaker(2), metrics.clone()));
        let publisher = ObservationPublisher::new(
            sink,
            "fhir.observation",
            EventFormat::Canonical,
            metrics.clone(),
        );
        let raw = json!({"resourceType": "Observation", "id": "obs-1"});
        let obs: Observation = serde_json::from_value(raw.clone()).unwrap();

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            outcomes.push(publisher.publish(&obs, &raw, OperationKind::Update).await);
        }

        assert_eq!(
            outcomes,
            vec![
                PublishOutcome::Dropped(DropReason::Publish),
                PublishOutcome::Dropped(DropReason::Publish),
                PublishOutcome::Dropped(DropReason::CircuitOpen),
                PublishOutcome::Dropped(DropReason::CircuitOpen),
                PublishOutcome::Dropped(DropReason::CircuitOpen),
            ]
        );
        assert_eq!(failing.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(dropped_count(&metrics, "publish"), 2);
        assert_eq!(dropped_count(&metrics, "circuit_open"), 3);
        assert_eq!(metrics.circuit_breaker_state.get(), 1);
    }
}
