// ============================================================================
// Observation Domain
// ============================================================================
//
// - Value objects (Observation, Reference, Period, Quantity, ...)
// - Extractors (total field extraction with fallback chains)
// - Events (CanonicalEvent and the mapper)
//
// ============================================================================

pub mod value_objects;
pub mod extractors;
pub mod events;

pub use value_objects::*;
pub use events::{map, CanonicalEvent, ObservationDeleted, ObservationUpserted};
