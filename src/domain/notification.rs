use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::observation::Observation;

// ============================================================================
// Change Notifications
// ============================================================================
//
// What the delivery framework hands the gate for every resource change:
// subscription id, operation tag and the raw resource payload.
//
// ============================================================================

/// Operation that produced the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    ManuallyTriggered,
    Transaction,
    /// Any framework-defined kind not listed above
    #[serde(other)]
    Other,
}

impl OperationKind {
    /// Lower-cased tag used as the wire `op` value
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::ManuallyTriggered => "manually_triggered",
            OperationKind::Transaction => "transaction",
            OperationKind::Other => "other",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed view over a notification payload
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Observation(Box<Observation>),
    /// Any other resource type; carries the `resourceType` when present
    Other(Option<String>),
}

impl Resource {
    /// Decode a raw FHIR resource into its typed form.
    ///
    /// Returns `None` when the payload is not a JSON object or when an
    /// Observation payload cannot be decoded.
    pub fn from_json(payload: &Value) -> Option<Resource> {
        let object = payload.as_object()?;
        let resource_type = object.get("resourceType").and_then(Value::as_str);

        match resource_type {
            Some("Observation") => match Observation::deserialize(payload) {
                Ok(obs) => Some(Resource::Observation(Box::new(obs))),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Observation payload could not be decoded"
                    );
                    None
                }
            },
            other => Some(Resource::Other(other.map(String::from))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    pub subscription_id: String,
    pub operation: OperationKind,
    #[serde(default)]
    pub payload: Value,
}

impl ChangeNotification {
    pub fn new(subscription_id: impl Into<String>, operation: OperationKind, payload: Value) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            operation,
            payload,
        }
    }

    pub fn resource(&self) -> Option<Resource> {
        Resource::from_json(&self.payload)
    }
}
