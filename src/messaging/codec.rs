use serde::Serialize;
use serde_json::Value;

use crate::domain::observation::CanonicalEvent;
use crate::domain::OperationKind;
use crate::error::Result;

// ============================================================================
// Event Codec
// ============================================================================
//
// Renders events to the UTF-8 JSON bytes put on the wire. Field order follows
// struct declaration order, so output is byte-stable for equal events.
//
// ============================================================================

pub fn encode(event: &CanonicalEvent) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(event)?)
}

#[derive(Serialize)]
struct PassthroughEvent<'a> {
    op: &'a str,
    /// Full resource body as a JSON string
    observation: String,
}

/// `{"op": ..., "observation": "<resource json>"}` for the passthrough format
pub fn encode_passthrough(resource: &Value, operation: OperationKind) -> Result<Vec<u8>> {
    let event = PassthroughEvent {
        op: operation.as_str(),
        observation: serde_json::to_string(resource)?,
    };
    Ok(serde_json::to_vec(&event)?)
}
