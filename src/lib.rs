//! Publishes FHIR Observation changes to a NATS JetStream subject.
//!
//! The delivery framework calls [`delivery::DeliveryGate::before_delivery`]
//! once per change notification. Notifications for the configured
//! subscription are mapped to a versioned `ObservationOp` event and published
//! best-effort: broker or encoding failures are logged and dropped, never
//! returned to the framework.

pub mod config;
pub mod delivery;
pub mod domain;
pub mod error;
pub mod messaging;
pub mod metrics;
pub mod utils;

pub use config::BridgeConfig;
pub use delivery::{DeliveryGate, ObservationPublisher, PublishOutcome};
pub use domain::{ChangeNotification, OperationKind};
pub use error::{BridgeError, Result};
