//! OCR validation: score extracted fields against ground truth.
//!
//! ## Data Flow
//!
//! ```text
//! ground truth (CSV/XLSX) ─┐
//!                          ├─▶ aggregate ──▶ matcher (per document) ──▶ ValidationRun
//! OCR output (JSON) ───────┘
//! ```
//!
//! 1. [`load`]     : parse ground-truth tables and OCR JSON into typed records
//! 2. [`matcher`]  : compare one record with one OCR document, field by field
//! 3. [`aggregate`]: pair documents by id and roll comparisons up into
//!    document, field and overall accuracy
//! 4. [`export`]   : write the resulting tables as CSV

pub mod aggregate;
pub mod export;
pub mod load;
pub mod matcher;
pub mod model;
pub mod normalize;

use crate::config::ValidationConfig;
use crate::error::IntakeError;
use std::path::Path;

pub use aggregate::{aggregate, format_percent, AccuracyReport, ValidationRun};
pub use matcher::compare_document;
pub use model::{ExtractedField, FieldComparison, GroundTruthRecord, OcrDocument};

/// Load both inputs from disk and score them.
pub fn validate_files(
    ground_truth: &Path,
    ocr: &Path,
    config: &ValidationConfig,
) -> Result<ValidationRun, IntakeError> {
    let records = load::load_ground_truth(ground_truth, config)?;
    let documents = load::load_ocr_documents(ocr)?;
    Ok(aggregate(&records, &documents))
}
