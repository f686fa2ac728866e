//! Page persistence: deterministic names and atomic PNG writes.
//!
//! Every resolved document id owns a directory under the output root, so two
//! uploads of the same document type never overwrite each other's pages while
//! the filenames themselves stay predictable (`invoice_page2.png`).
//!
//! Pages are encoded into a temp file in the target directory and renamed
//! into place, so a reader never observes a half-written PNG.

use crate::error::IntakeError;
use crate::pipeline::payload::SourceKind;
use image::{ImageFormat, RgbImage};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
///
/// Leading dots are replaced too so `..` can never name a parent directory.
pub fn sanitize_component(raw: &str, fallback: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(raw.trim(), "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Filename for page `index` (1-based) of an upload.
pub fn page_filename(document_type: &str, source: SourceKind, index: usize) -> String {
    let prefix = sanitize_component(document_type, "document");
    match source {
        SourceKind::Pdf => format!("{prefix}_page{index}.png"),
        SourceKind::Image => format!("{prefix}_uploaded.png"),
    }
}

/// Directory holding every page of one document.
///
/// Ids that are already safe map to themselves. Any other id gets a short
/// digest of its raw form appended, so `a/b` and `a_b` stay apart.
pub fn document_dir(output_root: &Path, document_id: &str) -> PathBuf {
    let cleaned = sanitize_component(document_id, "document");
    if cleaned == document_id {
        return output_root.join(cleaned);
    }
    let digest = format!("{:x}", Sha256::digest(document_id.as_bytes()));
    output_root.join(format!("{cleaned}-{}", &digest[..8]))
}

/// Encode `image` as PNG and atomically place it at `dir/filename`.
///
/// Creates `dir` if it does not exist. Returns the final path.
pub fn write_png(dir: &Path, filename: &str, image: &RgbImage) -> Result<PathBuf, IntakeError> {
    std::fs::create_dir_all(dir).map_err(|e| IntakeError::filesystem(dir, e))?;

    let path = dir.join(filename);
    let tmp = tempfile::Builder::new()
        .prefix(".page-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| IntakeError::filesystem(dir, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|e| match e {
                image::ImageError::IoError(io) => IntakeError::filesystem(&path, io),
                other => IntakeError::Encode {
                    path: path.clone(),
                    detail: other.to_string(),
                },
            })?;
        writer
            .flush()
            .map_err(|e| IntakeError::filesystem(&path, e))?;
    }

    tmp.persist(&path)
        .map_err(|e| IntakeError::filesystem(&path, e.error))?;

    debug!(
        "Wrote {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(path)
}
