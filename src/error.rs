use thiserror::Error;

// ============================================================================
// Bridge Errors
// ============================================================================
//
// Every failure inside the delivery pipeline ends up as one of these and is
// consumed by the publisher or the gate. None of them cross the gate.
//
// ============================================================================

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to connect to NATS at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Failed to provision stream {stream}: {reason}")]
    Stream { stream: String, reason: String },

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publish to {subject} failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("Circuit breaker open for subject {0}, publish skipped without contacting the broker")]
    CircuitOpen(String),
}

impl BridgeError {
    pub fn publish(subject: &str, reason: impl ToString) -> Self {
        BridgeError::Publish {
            subject: subject.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
