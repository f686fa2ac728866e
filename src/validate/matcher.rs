//! Field-by-field comparison of one ground-truth record with one OCR document.

use super::model::{ExtractedField, FieldComparison, GroundTruthRecord, OcrDocument};
use super::normalize::{normalize_name, normalize_value};
use std::collections::HashMap;

/// Compare every ground-truth field against the OCR document.
///
/// Emits one [`FieldComparison`] per ground-truth field, in ground-truth
/// order. OCR fields are looked up by normalised name; when a name repeats,
/// the later extraction wins. A field missing from the OCR output compares
/// as `""`, so it matches only an empty expected value.
pub fn compare_document(ground_truth: &GroundTruthRecord, ocr: &OcrDocument) -> Vec<FieldComparison> {
    let mut lookup: HashMap<String, &ExtractedField> =
        HashMap::with_capacity(ocr.extracted_fields.len());
    for field in &ocr.extracted_fields {
        lookup.insert(normalize_name(&field.field_name), field);
    }

    ground_truth
        .fields
        .iter()
        .map(|(name, expected)| {
            let found = lookup.get(&normalize_name(name)).copied();
            let ocr_value = found.and_then(|f| f.value.clone()).unwrap_or_default();
            let is_match = normalize_value(expected.as_deref()) == normalize_value(Some(&ocr_value));

            FieldComparison {
                document_id: ground_truth.document_id.clone(),
                field_name: name.clone(),
                ground_truth_value: expected.clone(),
                ocr_value,
                confidence_score: found.and_then(|f| f.confidence_score),
                is_match,
            }
        })
        .collect()
}
