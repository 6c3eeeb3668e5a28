use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

// ============================================================================
// Observation Value Objects
// ============================================================================
//
// The slice of a FHIR R4 Observation the bridge reads. Every element is
// optional and unknown elements are ignored, so partial resources decode.
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: Option<String>,
    pub subject: Option<Reference>,
    pub code: Option<CodeableConcept>,

    // effective[x]
    pub effective_date_time: Option<String>,
    pub effective_period: Option<Period>,
    pub effective_instant: Option<String>,

    pub issued: Option<String>,

    // value[x]
    pub value_quantity: Option<Quantity>,
    pub value_codeable_concept: Option<CodeableConcept>,
    pub value_string: Option<String>,
    pub value_boolean: Option<bool>,
    pub value_integer: Option<i64>,
    pub value_date_time: Option<String>,
    pub value_time: Option<String>,
}

impl Observation {
    /// The populated `value[x]` choice, if any
    pub fn value(&self) -> Option<ObservationValue<'_>> {
        if let Some(q) = &self.value_quantity {
            return Some(ObservationValue::Quantity(q));
        }
        if let Some(cc) = &self.value_codeable_concept {
            return Some(ObservationValue::CodeableConcept(cc));
        }
        if let Some(s) = &self.value_string {
            return Some(ObservationValue::String(s));
        }
        if let Some(b) = self.value_boolean {
            return Some(ObservationValue::Boolean(b));
        }
        if let Some(i) = self.value_integer {
            return Some(ObservationValue::Integer(i));
        }
        if let Some(dt) = &self.value_date_time {
            return Some(ObservationValue::DateTime(dt));
        }
        self.value_time.as_deref().map(ObservationValue::Time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObservationValue<'a> {
    Quantity(&'a Quantity),
    CodeableConcept(&'a CodeableConcept),
    String(&'a str),
    Boolean(bool),
    Integer(i64),
    DateTime(&'a str),
    Time(&'a str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: Option<String>,
}

impl Reference {
    /// Logical id of the referenced resource.
    ///
    /// Handles `Patient/123`, `http://host/fhir/Patient/123` and
    /// `Patient/123/_history/2`. Contained (`#x`) and URN references have no
    /// id part.
    pub fn id_part(&self) -> Option<&str> {
        let reference = self.reference.as_deref()?.trim();
        if reference.is_empty() || reference.starts_with('#') || reference.starts_with("urn:") {
            return None;
        }

        let path = match reference.find("/_history/") {
            Some(idx) => &reference[..idx],
            None => reference,
        };

        let mut segments = path.rsplit('/');
        let id = segments.next().filter(|s| !s.is_empty())?;
        // A bare id with no resource type segment is not a resolvable reference
        segments.next().filter(|s| !s.is_empty())?;
        Some(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// The number exactly as written in the resource. A non-numeric value
    /// decodes as absent instead of failing the whole resource.
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<Number>,
    pub unit: Option<String>,
}

impl Quantity {
    /// Decimal text of the value.
    ///
    /// Exponent forms are normalized (`1.5e2` becomes `150`) and plain
    /// decimals keep their scale (`1.50`). Numbers too long for `Decimal`
    /// are rendered from their literal text.
    pub fn value_text(&self) -> Option<String> {
        let literal = self.value.as_ref()?.to_string();
        let parsed = if literal.contains(['e', 'E']) {
            Decimal::from_scientific(&literal)
        } else {
            Decimal::from_str_exact(&literal)
        };
        Some(parsed.map(|d| d.to_string()).unwrap_or(literal))
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => Some(n),
        _ => None,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
