//! Integration tests for OCR validation: files on disk through
//! `validate_files`, then CSV export.

use ocr_intake::validate::load::load_ground_truth;
use ocr_intake::validate::{export, format_percent};
use ocr_intake::{validate_files, ErrorKind, IntakeError, ValidationConfig};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    init_tracing();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const TRUTH: &str = "\
documentId,grade,gpa
D1,A,3.5
D2,B,2.9
D3,C,2.0
";

const OCR: &str = r#"[
  {
    "documentId": "D1",
    "extractedFields": [
      {"fieldName": "Grade", "value": "a", "confidence": 0.97},
      {"fieldName": "GPA", "value": " 3.5 ", "confidence": 0.88}
    ]
  },
  {
    "documentId": "D2",
    "extractedFields": [
      {"fieldName": "grade", "value": "B"}
    ]
  }
]"#;

#[test]
fn scores_documents_fields_and_overall() {
    let tmp = TempDir::new().unwrap();
    let gt = write(tmp.path(), "truth.csv", TRUTH);
    let ocr = write(tmp.path(), "ocr.json", OCR);

    let run = validate_files(&gt, &ocr, &ValidationConfig::default()).unwrap();
    let report = &run.report;

    // Case and surrounding whitespace are ignored.
    assert_eq!(report.per_document_accuracy["D1"], Some(1.0));
    // D2 has no gpa in its OCR output.
    assert_eq!(report.per_document_accuracy["D2"], Some(0.5));
    // D3 has no OCR output at all and is not scored.
    assert!(!report.per_document_accuracy.contains_key("D3"));
    assert_eq!(run.unmatched_documents, vec!["D3".to_string()]);

    assert_eq!(report.per_field_accuracy["grade"], 1.0);
    assert_eq!(report.per_field_accuracy["gpa"], 0.5);
    assert_eq!(report.overall_accuracy, Some(0.75));
    assert_eq!(format_percent(report.overall_accuracy), "75.00%");

    assert_eq!(run.comparisons.len(), 4);
    let d1_grade = &run.comparisons[0];
    assert_eq!(d1_grade.document_id, "D1");
    assert_eq!(d1_grade.field_name, "grade");
    assert_eq!(d1_grade.ocr_value, "a");
    assert_eq!(d1_grade.confidence_score, Some(0.97));
    assert!(d1_grade.is_match);

    let d2_gpa = &run.comparisons[3];
    assert_eq!(d2_gpa.field_name, "gpa");
    assert_eq!(d2_gpa.ocr_value, "");
    assert_eq!(d2_gpa.confidence_score, None);
    assert!(!d2_gpa.is_match);
}

#[test]
fn single_document_object_is_accepted() {
    let tmp = TempDir::new().unwrap();
    let gt = write(tmp.path(), "truth.csv", TRUTH);
    let ocr = write(
        tmp.path(),
        "ocr.json",
        r#"{"documentId": "D3", "extractedFields": [{"fieldName": "grade", "value": "c"}]}"#,
    );

    let run = validate_files(&gt, &ocr, &ValidationConfig::default()).unwrap();
    assert_eq!(run.report.documents_scored, 1);
    assert_eq!(run.report.per_document_accuracy["D3"], Some(0.5));
    assert_eq!(run.unmatched_documents, vec!["D1".to_string(), "D2".to_string()]);
}

#[test]
fn no_matching_documents_leaves_accuracy_undefined() {
    let tmp = TempDir::new().unwrap();
    let gt = write(tmp.path(), "truth.csv", TRUTH);
    let ocr = write(
        tmp.path(),
        "ocr.json",
        r#"[{"documentId": "Z9", "extractedFields": []}]"#,
    );

    let run = validate_files(&gt, &ocr, &ValidationConfig::default()).unwrap();
    assert_eq!(run.report.overall_accuracy, None);
    assert_eq!(format_percent(run.report.overall_accuracy), "N/A");
    assert!(run.comparisons.is_empty());
    assert_eq!(run.unmatched_documents.len(), 3);
}

#[test]
fn custom_id_column() {
    let tmp = TempDir::new().unwrap();
    let gt = write(tmp.path(), "truth.csv", "ref,total\nINV-1,10.00\n");
    let ocr = write(
        tmp.path(),
        "ocr.json",
        r#"[{"documentId": "INV-1", "extractedFields": [{"fieldName": "Total", "value": "10.00"}]}]"#,
    );

    let config = ValidationConfig::builder().id_column("ref").build().unwrap();
    let run = validate_files(&gt, &ocr, &config).unwrap();
    assert_eq!(run.report.overall_accuracy, Some(1.0));

    let err = validate_files(&gt, &ocr, &ValidationConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn malformed_ocr_json_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let gt = write(tmp.path(), "truth.csv", TRUTH);

    for (name, body) in [
        ("not_json.json", "{ nope"),
        ("no_id.json", r#"[{"extractedFields": []}]"#),
        ("no_fields.json", r#"[{"documentId": "D1"}]"#),
        ("fields_not_list.json", r#"[{"documentId": "D1", "extractedFields": {}}]"#),
    ] {
        let ocr = write(tmp.path(), name, body);
        let err = validate_files(&gt, &ocr, &ValidationConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput, "{name}: {err}");
    }
}

#[test]
fn missing_files_are_filesystem_errors() {
    let tmp = TempDir::new().unwrap();
    let ocr = write(tmp.path(), "ocr.json", OCR);

    let err = validate_files(
        &tmp.path().join("absent.csv"),
        &ocr,
        &ValidationConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Filesystem);
}

#[test]
fn export_writes_readable_tables() {
    let tmp = TempDir::new().unwrap();
    let gt = write(tmp.path(), "truth.csv", TRUTH);
    let ocr = write(tmp.path(), "ocr.json", OCR);
    let run = validate_files(&gt, &ocr, &ValidationConfig::default()).unwrap();

    let out = tmp.path().join("report");
    let paths = export::write_report_csv(&out, &run).unwrap();
    assert!(paths.iter().all(|p| p.starts_with(&out) && p.exists()));

    let mut reader = csv::Reader::from_path(out.join(export::COMPARISONS_FILE)).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), run.comparisons.len());
    assert_eq!(&rows[1][1], "gpa");
    assert_eq!(&rows[1][3], " 3.5 ");
    assert_eq!(&rows[1][5], "true");

    let docs = std::fs::read_to_string(out.join(export::DOCUMENT_ACCURACY_FILE)).unwrap();
    assert!(docs.contains("D1,100.00%"));
    assert!(docs.contains("D2,50.00%"));
}

// ── Spreadsheet ground truth ─────────────────────────────────────────────────

/// Workbook with a `Grades` sheet first, an `Other` sheet second and an
/// empty `Blank` sheet last.
fn write_workbook(dir: &Path) -> PathBuf {
    init_tracing();
    let path = dir.join("truth.xlsx");
    let mut workbook = Workbook::new();

    let grades = workbook.add_worksheet();
    grades.set_name("Grades").unwrap();
    grades.write_string(0, 0, "documentId").unwrap();
    grades.write_string(0, 1, "grade").unwrap();
    grades.write_string(0, 2, "credits").unwrap();
    grades.write_string(0, 3, "gpa").unwrap();
    grades.write_string(1, 0, "D1").unwrap();
    grades.write_string(1, 1, "A").unwrap();
    grades.write_number(1, 2, 4.0).unwrap();
    grades.write_number(1, 3, 3.5).unwrap();
    // Numeric id cell.
    grades.write_number(2, 0, 1001.0).unwrap();
    grades.write_string(2, 1, "B").unwrap();

    let other = workbook.add_worksheet();
    other.set_name("Other").unwrap();
    other.write_string(0, 0, "documentId").unwrap();
    other.write_string(0, 1, "total").unwrap();
    other.write_string(1, 0, "INV-9").unwrap();
    other.write_number(1, 1, 12.25).unwrap();

    workbook.add_worksheet().set_name("Blank").unwrap();

    workbook.save(&path).unwrap();
    path
}

#[test]
fn xlsx_first_sheet_renders_whole_floats_without_fraction() {
    let tmp = TempDir::new().unwrap();
    let path = write_workbook(tmp.path());

    let records = load_ground_truth(&path, &ValidationConfig::default()).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].document_id, "D1");
    assert_eq!(
        records[0].fields,
        vec![
            ("grade".to_string(), Some("A".to_string())),
            ("credits".to_string(), Some("4".to_string())),
            ("gpa".to_string(), Some("3.5".to_string())),
        ]
    );

    assert_eq!(records[1].document_id, "1001");
    assert_eq!(records[1].fields[1], ("credits".to_string(), None));
}

#[test]
fn xlsx_named_sheet_is_selected() {
    let tmp = TempDir::new().unwrap();
    let path = write_workbook(tmp.path());

    let config = ValidationConfig::builder().sheet("Other").build().unwrap();
    let records = load_ground_truth(&path, &config).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document_id, "INV-9");
    assert_eq!(
        records[0].fields,
        vec![("total".to_string(), Some("12.25".to_string()))]
    );
}

#[test]
fn xlsx_missing_or_empty_sheet_is_a_ground_truth_error() {
    let tmp = TempDir::new().unwrap();
    let path = write_workbook(tmp.path());

    for sheet in ["Nope", "Blank"] {
        let config = ValidationConfig::builder().sheet(sheet).build().unwrap();
        let err = load_ground_truth(&path, &config).unwrap_err();
        assert!(matches!(err, IntakeError::GroundTruth { .. }), "{sheet}: {err}");
        assert!(err.to_string().contains(sheet), "{err}");
    }
}

#[test]
fn xlsx_ground_truth_scores_like_csv() {
    let tmp = TempDir::new().unwrap();
    let gt = write_workbook(tmp.path());
    let ocr = write(
        tmp.path(),
        "ocr.json",
        r#"[{"documentId": "D1", "extractedFields": [
              {"fieldName": "Grade", "value": "a"},
              {"fieldName": "Credits", "value": "4"},
              {"fieldName": "GPA", "value": "3.50"}
           ]}]"#,
    );

    let run = validate_files(&gt, &ocr, &ValidationConfig::default()).unwrap();
    // "3.50" is not "3.5" after trim + lowercase.
    let d1 = run.report.per_document_accuracy["D1"].unwrap();
    assert!((d1 - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(run.unmatched_documents, vec!["1001".to_string()]);
}
