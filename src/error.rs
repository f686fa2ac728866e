//! Error types for the ocr-intake library.
//!
//! A single fatal error type, [`IntakeError`], covers both subsystems:
//!
//! * the **conversion pipeline** (payload decoding, rasterisation, page
//!   persistence), whose failures are folded into an error
//!   [`crate::output::ConversionResult`] by the orchestrator and never
//!   escape [`crate::convert::convert_blocking`];
//! * the **validation engine** (ground-truth and OCR input loading), whose
//!   failures are returned as `Err(IntakeError)` to the caller.
//!
//! [`ErrorKind`] is the stable, serialisable discriminant that ends up in
//! conversion results so a transport layer can pick a status code without
//! parsing the human-readable detail string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::payload::SourceKind;

/// All fatal errors returned by the ocr-intake library.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Payload errors ────────────────────────────────────────────────────
    /// The transport payload could not be turned into raw document bytes.
    #[error("Invalid document payload: {0}")]
    Payload(String),

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The bytes are neither a readable PDF nor a decodable raster image.
    #[error("Failed to decode {source_kind} payload: {detail}")]
    Decode {
        source_kind: SourceKind,
        detail: String,
    },

    /// pdfium could not be loaded, so PDF payloads cannot be rendered.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// Reading an input file, creating the output directory, or writing a
    /// page failed.
    #[error("Filesystem error at '{path}': {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A page could not be PNG-encoded on its way to disk.
    #[error("Failed to encode page image '{path}': {detail}")]
    Encode { path: PathBuf, detail: String },

    // ── Validation input errors ───────────────────────────────────────────
    /// Validation input is missing required structure.
    #[error("Malformed validation input: {0}")]
    MalformedInput(String),

    /// A ground-truth table exists but could not be read.
    #[error("Failed to read ground truth '{path}': {detail}")]
    GroundTruth { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// Shorthand for a filesystem error at `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IntakeError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// The coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::Payload(_) => ErrorKind::Payload,
            IntakeError::Decode { .. } => ErrorKind::Decode,
            IntakeError::PdfiumBindingFailed(_) => ErrorKind::RendererUnavailable,
            IntakeError::Filesystem { .. } | IntakeError::Encode { .. } => ErrorKind::Filesystem,
            IntakeError::MalformedInput(_) | IntakeError::GroundTruth { .. } => {
                ErrorKind::MalformedInput
            }
            IntakeError::InvalidConfig(_) => ErrorKind::Config,
            IntakeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Decode and payload failures need a different payload; filesystem
    /// failures (full disk, permissions) may clear up on their own.
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Filesystem | ErrorKind::Internal)
    }
}

/// Serialisable error category carried by error conversion results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Payload,
    Decode,
    RendererUnavailable,
    Filesystem,
    MalformedInput,
    Config,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Payload => "payload",
            ErrorKind::Decode => "decode",
            ErrorKind::RendererUnavailable => "renderer_unavailable",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}
