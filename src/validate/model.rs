//! Validation data model: ground truth, OCR output, and comparison records.

use crate::error::IntakeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Expected field values for one document.
///
/// Field names keep their original spelling for display; matching
/// normalises them. The identifier column is held in `document_id` and is
/// never one of `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthRecord {
    pub document_id: String,
    /// `(field name, expected value)` in column order. `None` = empty cell.
    pub fields: Vec<(String, Option<String>)>,
}

impl GroundTruthRecord {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), Some(value.into())));
        self
    }

    pub fn empty_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push((name.into(), None));
        self
    }
}

/// One field reported by an extraction backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field_name: String,
    pub value: Option<String>,
    pub confidence_score: Option<f64>,
}

impl ExtractedField {
    pub fn new(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            value: Some(value.into()),
            confidence_score: None,
        }
    }

    pub fn with_confidence(mut self, score: f64) -> Self {
        self.confidence_score = Some(score);
        self
    }

    fn from_json(entry: &Value, document_id: &str, position: usize) -> Result<Self, IntakeError> {
        let obj = entry.as_object().ok_or_else(|| {
            IntakeError::MalformedInput(format!(
                "document '{document_id}': extractedFields[{position}] is not an object"
            ))
        })?;

        let field_name = match obj.get("fieldName") {
            Some(Value::String(s)) => s.clone(),
            _ => {
                return Err(IntakeError::MalformedInput(format!(
                    "document '{document_id}': extractedFields[{position}] has no fieldName"
                )))
            }
        };

        let value = obj.get("value").and_then(scalar_text);
        let confidence_score = confidence(obj, document_id, &field_name);

        Ok(Self {
            field_name,
            value,
            confidence_score,
        })
    }
}

/// Extraction output for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrDocument {
    pub document_id: String,
    /// Names may repeat; the matcher keeps the last occurrence.
    pub extracted_fields: Vec<ExtractedField>,
}

impl OcrDocument {
    pub fn new(document_id: impl Into<String>, extracted_fields: Vec<ExtractedField>) -> Self {
        Self {
            document_id: document_id.into(),
            extracted_fields,
        }
    }

    /// Parse one `{documentId, extractedFields: [...]}` object.
    ///
    /// # Errors
    /// [`IntakeError::MalformedInput`] when the value is not an object, has
    /// no usable `documentId`, or has no `extractedFields` list.
    pub fn from_json(value: &Value) -> Result<Self, IntakeError> {
        let obj = value.as_object().ok_or_else(|| {
            IntakeError::MalformedInput("OCR document is not a JSON object".into())
        })?;

        let document_id = match obj.get("documentId") {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(IntakeError::MalformedInput(
                    "OCR document has no documentId".into(),
                ))
            }
        };

        let entries = match obj.get("extractedFields") {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(IntakeError::MalformedInput(format!(
                    "document '{document_id}': extractedFields is not a list"
                )))
            }
            None => {
                return Err(IntakeError::MalformedInput(format!(
                    "document '{document_id}' has no extractedFields list"
                )))
            }
        };

        let extracted_fields = entries
            .iter()
            .enumerate()
            .map(|(i, e)| ExtractedField::from_json(e, &document_id, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            document_id,
            extracted_fields,
        })
    }
}

/// Ground truth vs. OCR for one field of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldComparison {
    pub document_id: String,
    /// Ground-truth spelling, not normalised.
    pub field_name: String,
    pub ground_truth_value: Option<String>,
    /// Raw OCR value; empty when the field was not extracted.
    pub ocr_value: String,
    pub confidence_score: Option<f64>,
    pub is_match: bool,
}

/// Text form of a JSON scalar. Null is absent; containers keep their JSON text.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn confidence(obj: &Map<String, Value>, document_id: &str, field_name: &str) -> Option<f64> {
    let raw = ["confidence", "confidence_score", "confidenceScore"]
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))?;

    let score = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match score {
        Some(s) if (0.0..=1.0).contains(&s) => Some(s),
        Some(s) => {
            warn!(
                "Ignoring out-of-range confidence {} for '{}' in document '{}'",
                s, field_name, document_id
            );
            None
        }
        None => None,
    }
}
