// ============================================================================
// Delivery
// ============================================================================
//
// - gate     - subscription/resource filter invoked by the delivery framework
// - pipeline - map → encode → publish with failure isolation
// - workers  - bounded consumer pool for standalone runs
//
// ============================================================================

mod gate;
mod pipeline;
mod workers;

pub use gate::{DeliveryGate, CONTINUE_DELIVERY, DELIVERY_HANDLED};
pub use pipeline::{DropReason, ObservationPublisher, PublishOutcome};
pub use workers::{run_workers, WorkerStats};

#[cfg(test)]
pub(crate) use pipeline::test_support;
