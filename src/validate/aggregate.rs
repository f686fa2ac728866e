//! Roll field comparisons up into document, field and overall accuracy.
//!
//! Accuracy is never invented for an empty denominator: a document with no
//! comparable fields has `None` accuracy, and a run with no scored documents
//! has `None` overall accuracy. Both serialise as `null`.

use super::matcher::compare_document;
use super::model::{FieldComparison, GroundTruthRecord, OcrDocument};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Accuracy figures of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// Unweighted mean of the defined per-document accuracies.
    pub overall_accuracy: Option<f64>,
    /// Matched / compared fields, per document id.
    pub per_document_accuracy: BTreeMap<String, Option<f64>>,
    /// Match rate of each ground-truth field name across documents.
    pub per_field_accuracy: BTreeMap<String, f64>,
    /// Documents that had an OCR counterpart.
    pub documents_scored: usize,
}

impl AccuracyReport {
    /// Build the report from comparisons. `scored` lists every document that
    /// was paired, including ones that produced no comparisons.
    pub fn from_comparisons(scored: &[String], comparisons: &[FieldComparison]) -> Self {
        let mut per_doc: BTreeMap<String, Tally> =
            scored.iter().map(|id| (id.clone(), Tally::default())).collect();
        let mut per_field: BTreeMap<String, Tally> = BTreeMap::new();

        for c in comparisons {
            per_doc.entry(c.document_id.clone()).or_default().add(c.is_match);
            per_field.entry(c.field_name.clone()).or_default().add(c.is_match);
        }

        let per_document_accuracy: BTreeMap<String, Option<f64>> = per_doc
            .into_iter()
            .map(|(id, t)| (id, t.rate()))
            .collect();

        let defined: Vec<f64> = per_document_accuracy.values().flatten().copied().collect();
        let overall_accuracy = if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        };

        let per_field_accuracy = per_field
            .into_iter()
            .filter_map(|(name, t)| t.rate().map(|r| (name, r)))
            .collect();

        Self {
            overall_accuracy,
            documents_scored: per_document_accuracy.len(),
            per_document_accuracy,
            per_field_accuracy,
        }
    }
}

/// Render an accuracy fraction as a percentage, `N/A` when undefined.
pub fn format_percent(accuracy: Option<f64>) -> String {
    match accuracy {
        Some(a) => format!("{:.2}%", a * 100.0),
        None => "N/A".to_string(),
    }
}

/// Everything produced by [`aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRun {
    pub report: AccuracyReport,
    /// Every comparison, grouped by ground-truth row order.
    pub comparisons: Vec<FieldComparison>,
    /// Ground-truth document ids with no OCR document. Excluded from every
    /// accuracy figure.
    pub unmatched_documents: Vec<String>,
}

/// Pair ground truth with OCR output by document id and score the pairs.
///
/// When several OCR documents share an id, the last one wins. Ground-truth
/// rows without an OCR counterpart are skipped and listed in
/// [`ValidationRun::unmatched_documents`]. Repeated ground-truth rows for
/// one id pool their comparisons into that document's accuracy.
pub fn aggregate(ground_truth: &[GroundTruthRecord], ocr: &[OcrDocument]) -> ValidationRun {
    let by_id: HashMap<&str, &OcrDocument> =
        ocr.iter().map(|d| (d.document_id.as_str(), d)).collect();

    let mut comparisons = Vec::new();
    let mut scored: Vec<String> = Vec::new();
    let mut unmatched: Vec<String> = Vec::new();
    // Ordered vecs for output, sets for membership.
    let mut seen_scored: HashSet<&str> = HashSet::new();
    let mut seen_unmatched: HashSet<&str> = HashSet::new();

    for record in ground_truth {
        match by_id.get(record.document_id.as_str()) {
            Some(doc) => {
                let fields = compare_document(record, doc);
                debug!(
                    "Document {}: {} field(s) compared",
                    record.document_id,
                    fields.len()
                );
                comparisons.extend(fields);
                if seen_scored.insert(record.document_id.as_str()) {
                    scored.push(record.document_id.clone());
                }
            }
            None => {
                if seen_unmatched.insert(record.document_id.as_str()) {
                    unmatched.push(record.document_id.clone());
                }
            }
        }
    }

    if !unmatched.is_empty() {
        warn!(
            "{} ground-truth document(s) have no OCR output: {}",
            unmatched.len(),
            unmatched.join(", ")
        );
    }

    let report = AccuracyReport::from_comparisons(&scored, &comparisons);
    info!(
        "Validated {} document(s), overall accuracy {}",
        report.documents_scored,
        format_percent(report.overall_accuracy)
    );

    ValidationRun {
        report,
        comparisons,
        unmatched_documents: unmatched,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    matched: usize,
    total: usize,
}

impl Tally {
    fn add(&mut self, is_match: bool) {
        self.total += 1;
        if is_match {
            self.matched += 1;
        }
    }

    fn rate(self) -> Option<f64> {
        (self.total > 0).then(|| self.matched as f64 / self.total as f64)
    }
}
