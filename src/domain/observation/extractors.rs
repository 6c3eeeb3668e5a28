use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use super::value_objects::{CodeableConcept, Observation, ObservationValue};

// ============================================================================
// Field Extractors
// ============================================================================
//
// Total functions over an Observation. Each walks a fixed fallback chain and
// always yields a string; absence never escapes to the caller.
//
// ============================================================================

pub const UNKNOWN: &str = "<unknown>";
pub const UNKNOWN_DATE: &str = "unknown";

pub fn observation_id(obs: &Observation) -> String {
    obs.id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub fn patient_id(obs: &Observation) -> String {
    obs.subject
        .as_ref()
        .and_then(|subject| subject.id_part())
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub fn effective_start(obs: &Observation) -> String {
    obs.effective_period
        .as_ref()
        .and_then(|p| p.start.as_deref())
        .and_then(format_instant)
        .unwrap_or_else(|| effective_instant(obs))
}

pub fn effective_end(obs: &Observation) -> String {
    obs.effective_period
        .as_ref()
        .and_then(|p| p.end.as_deref())
        .and_then(format_instant)
        .unwrap_or_else(|| effective_instant(obs))
}

/// Shared fallback for start and end when no period bound applies:
/// effectiveDateTime, then effectiveInstant, then issued.
pub fn effective_instant(obs: &Observation) -> String {
    [
        obs.effective_date_time.as_deref(),
        obs.effective_instant.as_deref(),
        obs.issued.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find_map(format_instant)
    .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

pub fn code_text(obs: &Observation) -> String {
    obs.code
        .as_ref()
        .and_then(concept_text)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn value_text(obs: &Observation) -> String {
    let Some(value) = obs.value() else {
        return UNKNOWN.to_string();
    };

    match value {
        ObservationValue::Quantity(q) => {
            let number = q.value_text();
            let unit = q.unit.as_deref().filter(|u| !u.is_empty());
            match (number, unit) {
                (Some(n), Some(u)) => format!("{n} {u}"),
                (Some(n), None) => n,
                (None, Some(u)) => u.to_string(),
                (None, None) => UNKNOWN.to_string(),
            }
        }
        ObservationValue::CodeableConcept(cc) => {
            concept_text(cc).unwrap_or_else(|| UNKNOWN.to_string())
        }
        ObservationValue::String(s) => s.to_string(),
        ObservationValue::Boolean(b) => b.to_string(),
        ObservationValue::Integer(i) => i.to_string(),
        ObservationValue::DateTime(dt) => format_instant(dt).unwrap_or_else(|| dt.to_string()),
        ObservationValue::Time(t) => t.to_string(),
    }
}

/// `"<system> <code>"` from the first coding, else the concept's text
fn concept_text(cc: &CodeableConcept) -> Option<String> {
    if let Some(coding) = cc.coding.first() {
        let parts: Vec<&str> = [coding.system.as_deref(), coding.code.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if !parts.is_empty() {
            return Some(parts.join(" "));
        }
    }
    cc.text.clone().filter(|t| !t.is_empty())
}

// ============================================================================
// Date formatting
// ============================================================================

/// The one date renderer used by every date-bearing field.
///
/// Accepts FHIR `dateTime`/`instant` text at any precision and renders the
/// first instant it denotes as UTC `YYYY-MM-DDThh:mm:ssZ`. Returns `None`
/// when the text is not a recognizable date.
pub fn format_instant(raw: &str) -> Option<String> {
    parse_instant(raw.trim()).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Minute precision, e.g. 2024-01-01T00:00Z or 2024-01-01T00:00+02:00
    let minute_precision = raw.strip_suffix('Z').map(|s| format!("{s}+00:00"));
    if let Ok(dt) = DateTime::parse_from_str(
        minute_precision.as_deref().unwrap_or(raw),
        "%Y-%m-%dT%H:%M%:z",
    ) {
        return Some(dt.with_timezone(&Utc));
    }

    // Local date-time without offset is read as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    let date = match raw.len() {
        4 => NaiveDate::parse_from_str(&format!("{raw}-01-01"), "%Y-%m-%d").ok(),
        7 => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok(),
        _ => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok(),
    }?;
    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::observation::value_objects::{Coding, Period, Quantity, Reference};
    use serde_json::Number;
    use std::str::FromStr;

    fn coding(system: Option<&str>, code: Option<&str>) -> Coding {
        Coding {
            system: system.map(String::from),
            code: code.map(String::from),
            display: None,
        }
    }

    #[test]
    fn test_empty_observation_yields_sentinels() {
        let obs = Observation::default();
        assert_eq!(observation_id(&obs), "<unknown>");
        assert_eq!(patient_id(&obs), "<unknown>");
        assert_eq!(effective_start(&obs), "unknown");
        assert_eq!(effective_end(&obs), "unknown");
        assert_eq!(code_text(&obs), "<unknown>");
        assert_eq!(value_text(&obs), "<unknown>");
    }

    #[test]
    fn test_patient_id_from_subject() {
        let obs = Observation {
            subject: Some(Reference {
                reference: Some("Patient/123".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(patient_id(&obs), "123");
    }

    #[test]
    fn test_period_bounds_take_precedence() {
        let obs = Observation {
            effective_period: Some(Period {
                start: Some("2024-01-01T00:00:00Z".to_string()),
                end: Some("2024-01-01T01:30:00Z".to_string()),
            }),
            effective_date_time: Some("2023-06-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(effective_start(&obs), "2024-01-01T00:00:00Z");
        assert_eq!(effective_end(&obs), "2024-01-01T01:30:00Z");
    }

    #[test]
    fn test_period_without_end_falls_through_instant_chain() {
        let obs = Observation {
            effective_period: Some(Period {
                start: Some("2024-01-01T00:00Z".to_string()),
                end: None,
            }),
            ..Default::default()
        };
        assert_eq!(effective_start(&obs), "2024-01-01T00:00:00Z");
        assert_eq!(effective_end(&obs), "unknown");
    }

    #[test]
    fn test_instant_chain_order() {
        let mut obs = Observation {
            effective_date_time: Some("2024-02-02T10:00:00Z".to_string()),
            effective_instant: Some("2024-03-03T10:00:00Z".to_string()),
            issued: Some("2024-04-04T10:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(effective_start(&obs), "2024-02-02T10:00:00Z");

        obs.effective_date_time = None;
        assert_eq!(effective_start(&obs), "2024-03-03T10:00:00Z");

        obs.effective_instant = None;
        assert_eq!(effective_end(&obs), "2024-04-04T10:00:00Z");

        obs.issued = None;
        assert_eq!(effective_end(&obs), "unknown");
    }

    #[test]
    fn test_unparseable_date_falls_through() {
        let obs = Observation {
            effective_date_time: Some("yesterday".to_string()),
            issued: Some("2024-04-04T10:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(effective_start(&obs), "2024-04-04T10:00:00Z");
    }

    #[test]
    fn test_every_date_source_formats_identically() {
        let same_instant = "2024-05-06T07:08:09+00:00";
        let expected = "2024-05-06T07:08:09Z";

        let from_period = Observation {
            effective_period: Some(Period {
                start: Some(same_instant.to_string()),
                end: Some(same_instant.to_string()),
            }),
            ..Default::default()
        };
        let from_date_time = Observation {
            effective_date_time: Some(same_instant.to_string()),
            ..Default::default()
        };
        let from_instant = Observation {
            effective_instant: Some(same_instant.to_string()),
            ..Default::default()
        };
        let from_issued = Observation {
            issued: Some(same_instant.to_string()),
            ..Default::default()
        };

        assert_eq!(effective_start(&from_period), expected);
        assert_eq!(effective_end(&from_period), expected);
        assert_eq!(effective_start(&from_date_time), expected);
        assert_eq!(effective_end(&from_instant), expected);
        assert_eq!(effective_start(&from_issued), expected);
    }

    #[test]
    fn test_effective_extraction_is_idempotent() {
        let obs = Observation {
            effective_date_time: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert_eq!(effective_start(&obs), effective_start(&obs));
        assert_eq!(effective_end(&obs), effective_end(&obs));
    }

    #[test]
    fn test_format_instant_precisions() {
        assert_eq!(format_instant("2024").as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(format_instant("2024-03").as_deref(), Some("2024-03-01T00:00:00Z"));
        assert_eq!(format_instant("2024-03-15").as_deref(), Some("2024-03-15T00:00:00Z"));
        assert_eq!(
            format_instant("2024-03-15T12:30+02:00").as_deref(),
            Some("2024-03-15T10:30:00Z")
        );
        assert_eq!(
            format_instant("2024-03-15T12:30:45.123Z").as_deref(),
            Some("2024-03-15T12:30:45Z")
        );
        assert_eq!(format_instant("not a date"), None);
        assert_eq!(format_instant(""), None);
    }

    #[test]
    fn test_code_text_with_system() {
        let obs = Observation {
            code: Some(CodeableConcept {
                coding: vec![
                    coding(Some("http://loinc.org"), Some("8310-5")),
                    coding(Some("http://snomed.info/sct"), Some("386725007")),
                ],
                text: Some("Body temperature".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(code_text(&obs), "http://loinc.org 8310-5");
    }

    #[test]
    fn test_code_text_without_system() {
        let obs = Observation {
            code: Some(CodeableConcept {
                coding: vec![coding(None, Some("8310-5"))],
                text: None,
            }),
            ..Default::default()
        };
        assert_eq!(code_text(&obs), "8310-5");
    }

    #[test]
    fn test_code_text_falls_back_to_text() {
        let obs = Observation {
            code: Some(CodeableConcept {
                coding: vec![],
                text: Some("Body temperature".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(code_text(&obs), "Body temperature");
    }

    #[test]
    fn test_value_text_quantity() {
        let obs = Observation {
            value_quantity: Some(Quantity {
                value: Some(Number::from_str("98.6").unwrap()),
                unit: Some("°F".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(value_text(&obs), "98.6 °F");
    }

    #[test]
    fn test_value_text_quantity_without_unit() {
        let obs = Observation {
            value_quantity: Some(Quantity {
                value: Some(Number::from_str("0.10").unwrap()),
                unit: None,
            }),
            ..Default::default()
        };
        assert_eq!(value_text(&obs), "0.10");
    }

    #[test]
    fn test_value_text_primitives() {
        let string_obs = Observation {
            value_string: Some("positive".to_string()),
            ..Default::default()
        };
        let bool_obs = Observation {
            value_boolean: Some(false),
            ..Default::default()
        };
        let int_obs = Observation {
            value_integer: Some(42),
            ..Default::default()
        };
        assert_eq!(value_text(&string_obs), "positive");
        assert_eq!(value_text(&bool_obs), "false");
        assert_eq!(value_text(&int_obs), "42");
    }

    #[test]
    fn test_value_text_codeable_concept() {
        let obs = Observation {
            value_codeable_concept: Some(CodeableConcept {
                coding: vec![coding(Some("http://snomed.info/sct"), Some("260385009"))],
                text: Some("Negative".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(value_text(&obs), "http://snomed.info/sct 260385009");
    }
}
