use serde::Serialize;

use super::extractors;
use super::value_objects::Observation;
use crate::domain::notification::OperationKind;

// ============================================================================
// Observation Events - Canonical wire events
// ============================================================================
//
// Two shapes, both tagged type="ObservationOp", v=1:
// - Delete: observation id only
// - Upsert: create/update with the mapped fields and a derived display text
//
// ============================================================================

pub const EVENT_TYPE: &str = "ObservationOp";
pub const EVENT_VERSION: u8 = 1;

/// Canonical Event - one per handled operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CanonicalEvent {
    Delete(ObservationDeleted),
    Upsert(ObservationUpserted),
}

impl CanonicalEvent {
    pub fn op(&self) -> &str {
        match self {
            CanonicalEvent::Delete(e) => e.op,
            CanonicalEvent::Upsert(e) => e.op,
        }
    }

    pub fn observation_id(&self) -> &str {
        match self {
            CanonicalEvent::Delete(e) => &e.observation_id,
            CanonicalEvent::Upsert(e) => &e.observation_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDeleted {
    #[serde(rename = "type")]
    event_type: &'static str,
    v: u8,
    op: &'static str,
    observation_id: String,
}

impl ObservationDeleted {
    pub fn new(observation_id: String) -> Self {
        Self {
            event_type: EVENT_TYPE,
            v: EVENT_VERSION,
            op: OperationKind::Delete.as_str(),
            observation_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationUpserted {
    #[serde(rename = "type")]
    event_type: &'static str,
    v: u8,
    op: &'static str,
    observation_id: String,
    patient_id: String,
    effective_start: String,
    effective_end: String,
    code_text: String,
    value_text: String,
    display_text: String,
}

impl ObservationUpserted {
    /// Build an upsert event; `display_text` is always derived here.
    pub fn new(
        op: &'static str,
        observation_id: String,
        patient_id: String,
        effective_start: String,
        effective_end: String,
        code_text: String,
        value_text: String,
    ) -> Self {
        let display_text = display_text(
            &patient_id,
            &code_text,
            &value_text,
            &effective_start,
            &effective_end,
        );
        Self {
            event_type: EVENT_TYPE,
            v: EVENT_VERSION,
            op,
            observation_id,
            patient_id,
            effective_start,
            effective_end,
            code_text,
            value_text,
            display_text,
        }
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn effective_start(&self) -> &str {
        &self.effective_start
    }

    pub fn effective_end(&self) -> &str {
        &self.effective_end
    }

    pub fn code_text(&self) -> &str {
        &self.code_text
    }

    pub fn value_text(&self) -> &str {
        &self.value_text
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }
}

pub fn display_text(
    patient_id: &str,
    code_text: &str,
    value_text: &str,
    effective_start: &str,
    effective_end: &str,
) -> String {
    format!(
        "Observation|subject={patient_id}|code={code_text}|value={value_text}|effectiveStart='{effective_start}'|effectiveEnd='{effective_end}'"
    )
}

/// Classify an (observation, operation) pair into its canonical event.
///
/// Returns `None` for operation kinds this bridge does not publish.
pub fn map(obs: &Observation, operation: OperationKind) -> Option<CanonicalEvent> {
    match operation {
        OperationKind::Delete => Some(CanonicalEvent::Delete(ObservationDeleted::new(
            extractors::observation_id(obs),
        ))),
        OperationKind::Create | OperationKind::Update => {
            Some(CanonicalEvent::Upsert(ObservationUpserted::new(
                operation.as_str(),
                extractors::observation_id(obs),
                extractors::patient_id(obs),
                extractors::effective_start(obs),
                extractors::effective_end(obs),
                extractors::code_text(obs),
                extractors::value_text(obs),
            )))
        }
        _ => None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
