//! CSV export of validation results.

use super::aggregate::{format_percent, ValidationRun};
use super::model::FieldComparison;
use crate::error::IntakeError;
use std::path::{Path, PathBuf};
use tracing::info;

pub const COMPARISONS_FILE: &str = "field_comparisons.csv";
pub const DOCUMENT_ACCURACY_FILE: &str = "document_accuracy.csv";
pub const FIELD_ACCURACY_FILE: &str = "field_accuracy.csv";

/// Write the full comparison table.
pub fn write_comparisons_csv(path: &Path, comparisons: &[FieldComparison]) -> Result<(), IntakeError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    w.write_record([
        "documentId",
        "field_name",
        "ground_truth",
        "ocr_value",
        "confidence_score",
        "match",
    ])
    .map_err(|e| csv_error(path, e))?;

    for c in comparisons {
        let confidence = c.confidence_score.map(|s| s.to_string()).unwrap_or_default();
        w.write_record([
            c.document_id.as_str(),
            c.field_name.as_str(),
            c.ground_truth_value.as_deref().unwrap_or(""),
            c.ocr_value.as_str(),
            confidence.as_str(),
            if c.is_match { "true" } else { "false" },
        ])
        .map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| IntakeError::filesystem(path, e))
}

/// Write comparison, per-document and per-field tables into `dir`.
///
/// Returns the written paths.
pub fn write_report_csv(dir: &Path, run: &ValidationRun) -> Result<Vec<PathBuf>, IntakeError> {
    std::fs::create_dir_all(dir).map_err(|e| IntakeError::filesystem(dir, e))?;

    let comparisons = dir.join(COMPARISONS_FILE);
    write_comparisons_csv(&comparisons, &run.comparisons)?;

    let documents = dir.join(DOCUMENT_ACCURACY_FILE);
    write_table(
        &documents,
        ["documentId", "accuracy (%)"],
        run.report
            .per_document_accuracy
            .iter()
            .map(|(id, acc)| (id.clone(), format_percent(*acc))),
    )?;

    let fields = dir.join(FIELD_ACCURACY_FILE);
    write_table(
        &fields,
        ["field_name", "accuracy (%)"],
        run.report
            .per_field_accuracy
            .iter()
            .map(|(name, acc)| (name.clone(), format_percent(Some(*acc)))),
    )?;

    info!("Exported validation tables to {}", dir.display());
    Ok(vec![comparisons, documents, fields])
}

fn write_table(
    path: &Path,
    header: [&str; 2],
    rows: impl Iterator<Item = (String, String)>,
) -> Result<(), IntakeError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    w.write_record(header).map_err(|e| csv_error(path, e))?;
    for (key, value) in rows {
        w.write_record([key, value]).map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| IntakeError::filesystem(path, e))
}

fn csv_error(path: &Path, err: csv::Error) -> IntakeError {
    IntakeError::filesystem(path, err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::aggregate::aggregate;
    use crate::validate::model::{ExtractedField, GroundTruthRecord, OcrDocument};
    use tempfile::TempDir;

    #[test]
    fn exports_three_tables() {
        let gt = vec![GroundTruthRecord::new("D1").field("grade", "A").field("gpa", "3.5")];
        let ocr = vec![OcrDocument::new(
            "D1",
            vec![ExtractedField::new("Grade", "a").with_confidence(0.5)],
        )];
        let run = aggregate(&gt, &ocr);

        let tmp = TempDir::new().unwrap();
        let paths = write_report_csv(tmp.path(), &run).unwrap();
        assert_eq!(paths.len(), 3);

        let comparisons = std::fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = comparisons.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "D1,grade,A,a,0.5,true");
        assert_eq!(lines[2], "D1,gpa,3.5,,,false");

        let docs = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(docs.contains("D1,50.00%"), "{docs}");

        let fields = std::fs::read_to_string(&paths[2]).unwrap();
        assert!(fields.contains("gpa,0.00%"));
        assert!(fields.contains("grade,100.00%"));
    }
}
