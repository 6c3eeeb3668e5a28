// ============================================================================
// Domain Layer
// ============================================================================
//
// Resource-side types and the pure mapping logic:
// - notification/ - what the delivery framework hands us
// - observation/  - Observation model, field extractors, canonical events
//
// Nothing in here performs I/O.
//
// ============================================================================

pub mod notification;
pub mod observation;

pub use notification::{ChangeNotification, OperationKind, Resource};
