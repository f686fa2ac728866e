//! # ocr-intake
//!
//! Two halves of an OCR ingestion workflow:
//!
//! * **Document normalisation**: turn an uploaded scan or multi-page PDF
//!   into a deterministic set of RGB page images on disk, with per-page
//!   dimensions and timing.
//! * **Validation**: score OCR-extracted field values against a
//!   ground-truth table, producing per-field, per-document and overall
//!   accuracy.
//!
//! The OCR / extraction step in between is not part of this crate; its output
//! is consumed as already-parsed `{fieldName, value, confidence}` records.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload bytes
//!  │
//!  ├─ 1. Payload  base64 decode, `%PDF` sniff
//!  ├─ 2. Render   pdfium (per page) or image decode (single page) → RGB8
//!  └─ 3. Persist  <output_root>/<documentId>/<type>_page<N>.png
//!
//! ground truth + OCR JSON
//!  │
//!  ├─ 1. Load       CSV / spreadsheet / JSON → typed records
//!  ├─ 2. Match      normalised names and values, field by field
//!  └─ 3. Aggregate  document, field and overall accuracy
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_intake::{convert_blocking, ConversionConfig, UploadRequest};
//!
//! let config = ConversionConfig::builder()
//!     .output_root("/tmp/pages")
//!     .build()
//!     .unwrap();
//! let bytes = std::fs::read("statement.pdf").unwrap();
//! let result = convert_blocking(&UploadRequest::new("statement", bytes), &config);
//! for (path, page) in result.saved_paths().iter().zip(result.page_metadata()) {
//!     println!("{} {}x{}", path.display(), page.width, page.height);
//! }
//! ```
//!
//! ```rust
//! use ocr_intake::validate::{aggregate, ExtractedField, GroundTruthRecord, OcrDocument};
//!
//! let truth = GroundTruthRecord::new("D1").field("grade", "A").field("gpa", "3.5");
//! let ocr = OcrDocument::new("D1", vec![
//!     ExtractedField::new("Grade", "a"),
//!     ExtractedField::new("GPA", "3.5"),
//! ]);
//! let run = aggregate(&[truth], &[ocr]);
//! assert_eq!(run.report.overall_accuracy, Some(1.0));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-intake` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! PDF rendering needs the pdfium shared library at runtime. Point
//! `PDFIUM_LIB_PATH` (or [`ConversionConfig::pdfium_library_path`]) at it, or
//! install it on the system library path. Image uploads do not need pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ValidationConfig};
pub use convert::{
    convert, convert_batch, convert_blocking, convert_encoded, convert_encoded_batch,
    convert_encoded_blocking, EncodedUpload, UploadRequest,
};
pub use error::{ErrorKind, IntakeError};
pub use output::{ConversionResult, PageInfo};
pub use pipeline::payload::SourceKind;
pub use pipeline::render::{rasterize, PageImage, Rasterized};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use validate::{validate_files, AccuracyReport, ValidationRun};
