// ============================================================================
// Messaging
// ============================================================================
//
// - codec   - event → UTF-8 JSON bytes
// - nats    - EventSink trait and the JetStream-backed publisher
// - circuit - circuit breaker in front of any EventSink
//
// ============================================================================

mod circuit;
pub mod codec;
mod nats;

pub use circuit::CircuitBreakerSink;
pub use nats::{EventSink, NatsPublisher};
