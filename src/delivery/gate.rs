use std::sync::Arc;
use uuid::Uuid;

use super::pipeline::{ObservationPublisher, PublishOutcome};
use crate::domain::{ChangeNotification, Resource};
use crate::metrics::Metrics;

// ============================================================================
// Delivery Gate
// ============================================================================
//
// Entry point called by the delivery framework before it delivers a change
// notification. The return value tells the framework whether to continue:
//
// - true  -> not ours, framework delivers as usual
// - false -> claimed and handled here, framework must skip its own delivery
//
// A claimed notification is "handled" even when its payload is not an
// Observation or the publish fails. The gate never panics or errors.
//
// ============================================================================

pub const CONTINUE_DELIVERY: bool = true;
pub const DELIVERY_HANDLED: bool = false;

pub struct DeliveryGate {
    subscription_id: String,
    publisher: ObservationPublisher,
    metrics: Arc<Metrics>,
}

impl DeliveryGate {
    pub fn new(
        subscription_id: impl Into<String>,
        publisher: ObservationPublisher,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            publisher,
            metrics,
        }
    }

    /// Hook invoked once per change notification, before default delivery
    pub async fn before_delivery(&self, notification: &ChangeNotification) -> bool {
        if notification.subscription_id != self.subscription_id {
            self.metrics.record_declined();
            return CONTINUE_DELIVERY;
        }

        let delivery_id = Uuid::now_v7();
        self.metrics.record_claimed();

        let outcome = match notification.resource() {
            Some(Resource::Observation(obs)) => Some(
                self.publisher
                    .publish(&obs, &notification.payload, notification.operation)
                    .await,
            ),
            Some(Resource::Other(resource_type)) => {
                tracing::debug!(
                    delivery_id = %delivery_id,
                    resource_type = resource_type.as_deref().unwrap_or("<none>"),
                    "Payload is not an Observation, nothing to publish"
                );
                self.metrics.record_skipped("not_observation");
                None
            }
            None => {
                tracing::debug!(
                    delivery_id = %delivery_id,
                    "Payload has no decodable resource, nothing to publish"
                );
                self.metrics.record_skipped("no_resource");
                None
            }
        };

        tracing::info!(
            target: "audit",
            subscription_id = %self.subscription_id,
            delivery_id = %delivery_id,
            op = %notification.operation,
            published = matches!(outcome, Some(PublishOutcome::Published)),
            "Delivered message for subscription {}",
            self.subscription_id
        );

        DELIVERY_HANDLED
    }
}
