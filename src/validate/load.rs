//! Loading validation inputs: OCR JSON and ground-truth tables.
//!
//! Ground truth is tabular: one row per document, one column per expected
//! field, plus an identifier column (`documentId` by default). CSV files are
//! read with `csv`; spreadsheets (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`)
//! with `calamine`.

use super::model::{GroundTruthRecord, OcrDocument};
use super::normalize::normalize_name;
use crate::config::ValidationConfig;
use crate::error::IntakeError;
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ── OCR output ───────────────────────────────────────────────────────────

/// Parse OCR output: a single document object or an array of them.
pub fn parse_ocr_documents(root: &Value) -> Result<Vec<OcrDocument>, IntakeError> {
    match root {
        Value::Object(_) => Ok(vec![OcrDocument::from_json(root)?]),
        Value::Array(items) => items.iter().map(OcrDocument::from_json).collect(),
        _ => Err(IntakeError::MalformedInput(
            "OCR JSON must be an object or a list of objects".into(),
        )),
    }
}

/// Read and parse an OCR JSON file.
pub fn load_ocr_documents(path: &Path) -> Result<Vec<OcrDocument>, IntakeError> {
    let text = std::fs::read_to_string(path).map_err(|e| IntakeError::filesystem(path, e))?;
    let root: Value = serde_json::from_str(&text).map_err(|e| {
        IntakeError::MalformedInput(format!("{}: invalid JSON: {e}", path.display()))
    })?;
    let docs = parse_ocr_documents(&root)?;
    info!("Loaded {} OCR document(s) from {}", docs.len(), path.display());
    Ok(docs)
}

// ── Ground truth ─────────────────────────────────────────────────────────

/// Load a ground-truth table, choosing the reader from the file extension.
pub fn load_ground_truth(
    path: &Path,
    config: &ValidationConfig,
) -> Result<Vec<GroundTruthRecord>, IntakeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let records = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).map_err(|e| IntakeError::filesystem(path, e))?;
            read_ground_truth_csv(file, config).map_err(|e| with_path(e, path))?
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_ground_truth_sheet(path, config)?,
        other => {
            return Err(IntakeError::GroundTruth {
                path: path.to_path_buf(),
                detail: format!("unsupported file type '.{other}' (expected .csv or a spreadsheet)"),
            })
        }
    };

    info!(
        "Loaded {} ground-truth row(s) from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Read CSV ground truth from any reader. The first row is the header.
pub fn read_ground_truth_csv<R: Read>(
    reader: R,
    config: &ValidationConfig,
) -> Result<Vec<GroundTruthRecord>, IntakeError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| IntakeError::MalformedInput(format!("unreadable CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = csv_reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(cell_text).collect::<Vec<_>>())
                .map_err(|e| IntakeError::MalformedInput(format!("unreadable CSV row: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    records_from_rows(&headers, rows, config)
}

fn read_ground_truth_sheet(
    path: &Path,
    config: &ValidationConfig,
) -> Result<Vec<GroundTruthRecord>, IntakeError> {
    let sheet_error = |detail: String| IntakeError::GroundTruth {
        path: path.to_path_buf(),
        detail,
    };

    let mut workbook =
        open_workbook_auto(path).map_err(|e| sheet_error(format!("failed to open workbook: {e}")))?;

    let sheet_name = match &config.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| sheet_error("workbook has no sheets".into()))?,
    };
    debug!("Reading ground truth from sheet '{}'", sheet_name);

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| sheet_error(format!("sheet '{sheet_name}' unreadable: {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|c| data_text(c).unwrap_or_default()).collect())
        .unwrap_or_default();
    if headers.iter().all(|h: &String| h.trim().is_empty()) {
        return Err(sheet_error(format!("sheet '{sheet_name}' is empty")));
    }

    let body: Vec<Vec<Option<String>>> = rows
        .map(|row| row.iter().map(data_text).collect())
        .collect();

    records_from_rows(&headers, body, config).map_err(|e| with_path(e, path))
}

/// Turn header + rows into records, splitting out the id column.
fn records_from_rows(
    headers: &[String],
    rows: Vec<Vec<Option<String>>>,
    config: &ValidationConfig,
) -> Result<Vec<GroundTruthRecord>, IntakeError> {
    let wanted = normalize_name(&config.id_column);
    let id_index = headers
        .iter()
        .position(|h| normalize_name(h) == wanted)
        .ok_or_else(|| {
            IntakeError::MalformedInput(format!(
                "ground truth has no '{}' column (found: {})",
                config.id_column,
                headers.join(", ")
            ))
        })?;

    let mut records = Vec::with_capacity(rows.len());
    for (row_no, row) in rows.into_iter().enumerate() {
        // Blank spreadsheet rows.
        if row.iter().all(Option::is_none) {
            continue;
        }

        let document_id = match row.get(id_index).cloned().flatten() {
            Some(id) => id.trim().to_string(),
            None => {
                warn!("Skipping ground-truth row {}: empty document id", row_no + 2);
                continue;
            }
        };

        let fields = headers
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != id_index && !h.trim().is_empty())
            .map(|(i, h)| (h.clone(), row.get(i).cloned().flatten()))
            .collect();

        records.push(GroundTruthRecord {
            document_id,
            fields,
        });
    }
    Ok(records)
}

fn cell_text(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn data_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => cell_text(s),
        // f64 Display already drops a zero fraction (4.0 → "4").
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn with_path(err: IntakeError, path: &Path) -> IntakeError {
    match err {
        IntakeError::MalformedInput(detail) => IntakeError::GroundTruth {
            path: path.to_path_buf(),
            detail,
        },
        other => other,
    }
}
