//! Conversion entry points: upload → persisted page images.
//!
//! [`convert_blocking`] is the core: resolve the document id, rasterise,
//! persist, and report timings. It never returns an error or panics out to
//! the caller; every failure becomes a [`ConversionResult::Error`] with the
//! failure's message and the time spent up to that point.
//!
//! [`convert`], [`convert_encoded`] and their `_batch` forms are async
//! conveniences that move the blocking work onto tokio's blocking pool.

use crate::config::ConversionConfig;
use crate::error::{ErrorKind, IntakeError};
use crate::output::{ConversionResult, PageInfo};
use crate::pipeline::{payload, persist, render};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A decoded upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Label used as the filename prefix of every page (`invoice`, `transcript`, …).
    pub document_type: String,
    pub raw_bytes: Vec<u8>,
    /// Caller-supplied id; generated when absent or blank.
    pub document_id: Option<String>,
}

impl UploadRequest {
    pub fn new(document_type: impl Into<String>, raw_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            document_type: document_type.into(),
            raw_bytes: raw_bytes.into(),
            document_id: None,
        }
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }
}

/// An upload as it arrives from the transport layer, document still base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedUpload {
    #[serde(alias = "documenttype", alias = "documentType")]
    pub document_type: String,
    /// Base64 (optionally a `data:` URI).
    pub document: String,
    #[serde(default, alias = "documentid", alias = "documentId")]
    pub document_id: Option<String>,
}

/// Use the caller's id when it has content, otherwise mint a v4 UUID.
pub fn resolve_document_id(supplied: Option<&str>) -> String {
    match supplied.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

/// Convert one upload synchronously.
pub fn convert_blocking(request: &UploadRequest, config: &ConversionConfig) -> ConversionResult {
    let total_start = Instant::now();
    let document_id = resolve_document_id(request.document_id.as_deref());
    convert_resolved(
        total_start,
        document_id,
        &request.document_type,
        &request.raw_bytes,
        config,
    )
}

/// Decode a transport payload and convert it.
///
/// Base64 failures are reported like any other conversion failure.
pub fn convert_encoded_blocking(
    upload: &EncodedUpload,
    config: &ConversionConfig,
) -> ConversionResult {
    let total_start = Instant::now();
    let document_id = resolve_document_id(upload.document_id.as_deref());

    match payload::decode_transport(&upload.document) {
        Ok(bytes) => convert_resolved(
            total_start,
            document_id,
            &upload.document_type,
            &bytes,
            config,
        ),
        Err(e) => failure(document_id, e, 0.0, total_start),
    }
}

/// Convert one upload on tokio's blocking pool.
pub async fn convert(request: UploadRequest, config: &ConversionConfig) -> ConversionResult {
    let total_start = Instant::now();
    let document_id = resolve_document_id(request.document_id.as_deref());
    let config = config.clone();
    let id = document_id.clone();

    tokio::task::spawn_blocking(move || {
        convert_resolved(
            total_start,
            id,
            &request.document_type,
            &request.raw_bytes,
            &config,
        )
    })
    .await
    .unwrap_or_else(|e| {
        failure(
            document_id,
            IntakeError::Internal(format!("Conversion task panicked: {e}")),
            0.0,
            total_start,
        )
    })
}

/// Decode and convert one transport upload on tokio's blocking pool.
pub async fn convert_encoded(mut upload: EncodedUpload, config: &ConversionConfig) -> ConversionResult {
    let total_start = Instant::now();
    let document_id = resolve_document_id(upload.document_id.as_deref());
    upload.document_id = Some(document_id.clone());
    let config = config.clone();

    tokio::task::spawn_blocking(move || convert_encoded_blocking(&upload, &config))
        .await
        .unwrap_or_else(|e| {
            failure(
                document_id,
                IntakeError::Internal(format!("Conversion task panicked: {e}")),
                0.0,
                total_start,
            )
        })
}

/// Convert independent uploads concurrently (`config.concurrency` at a time).
///
/// Results come back in the order of `requests`.
pub async fn convert_batch(
    requests: Vec<UploadRequest>,
    config: &ConversionConfig,
) -> Vec<ConversionResult> {
    run_batch(requests.into_iter().map(BatchItem::Decoded).collect(), config).await
}

/// Like [`convert_batch`] for uploads whose document is still base64.
///
/// An upload that fails to decode yields an error result for that upload
/// only; the rest of the batch is still converted.
pub async fn convert_encoded_batch(
    uploads: Vec<EncodedUpload>,
    config: &ConversionConfig,
) -> Vec<ConversionResult> {
    run_batch(uploads.into_iter().map(BatchItem::Encoded).collect(), config).await
}

enum BatchItem {
    Decoded(UploadRequest),
    Encoded(EncodedUpload),
}

impl BatchItem {
    fn document_type(&self) -> &str {
        match self {
            BatchItem::Decoded(r) => &r.document_type,
            BatchItem::Encoded(u) => &u.document_type,
        }
    }

    async fn run(self, config: &ConversionConfig) -> ConversionResult {
        match self {
            BatchItem::Decoded(r) => convert(r, config).await,
            BatchItem::Encoded(u) => convert_encoded(u, config).await,
        }
    }
}

async fn run_batch(items: Vec<BatchItem>, config: &ConversionConfig) -> Vec<ConversionResult> {
    let total = items.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut indexed: Vec<(usize, ConversionResult)> =
        stream::iter(items.into_iter().enumerate().map(|(idx, item)| {
            let config = config.clone();
            async move {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_start(item.document_type());
                }
                let result = item.run(&config).await;
                if let Some(ref cb) = config.progress_callback {
                    match result.error_detail() {
                        None => cb.on_document_complete(
                            result.document_id(),
                            result.saved_paths().len(),
                            result.total_time_seconds(),
                        ),
                        Some(detail) => cb.on_document_error(result.document_id(), detail),
                    }
                }
                (idx, result)
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    indexed.sort_by_key(|(idx, _)| *idx);
    let results: Vec<ConversionResult> = indexed.into_iter().map(|(_, r)| r).collect();

    let ok = results.iter().filter(|r| r.is_success()).count();
    info!("Batch complete: {}/{} uploads converted", ok, total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, ok);
    }
    results
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn convert_resolved(
    total_start: Instant,
    document_id: String,
    document_type: &str,
    raw: &[u8],
    config: &ConversionConfig,
) -> ConversionResult {
    info!(
        "Converting upload {} (type '{}', {} bytes)",
        document_id,
        document_type,
        raw.len()
    );

    let service_start = Instant::now();
    let outcome = rasterize_and_persist(raw, document_type, &document_id, config);
    let service_time_seconds = service_start.elapsed().as_secs_f64();

    match outcome {
        Ok((saved_paths, page_metadata)) => {
            let total_time_seconds = total_start.elapsed().as_secs_f64();
            info!(
                "Converted {}: {} page(s) in {:.3}s",
                document_id,
                saved_paths.len(),
                total_time_seconds
            );
            ConversionResult::Success {
                document_id,
                saved_paths,
                page_metadata,
                service_time_seconds,
                total_time_seconds,
            }
        }
        Err(e) => failure(document_id, e, service_time_seconds, total_start),
    }
}

fn rasterize_and_persist(
    raw: &[u8],
    document_type: &str,
    document_id: &str,
    config: &ConversionConfig,
) -> Result<(Vec<PathBuf>, Vec<PageInfo>), IntakeError> {
    let rasterized = render::rasterize(raw, config)?;
    let source = rasterized.source;
    let dir = persist::document_dir(&config.output_root, document_id);

    let mut saved_paths = Vec::with_capacity(rasterized.pages.len());
    let mut page_metadata = Vec::with_capacity(rasterized.pages.len());

    // Pages are consumed so each pixel buffer is freed once it is on disk.
    for page in rasterized.pages {
        let filename = persist::page_filename(document_type, source, page.index);
        match persist::write_png(&dir, &filename, &page.pixels) {
            Ok(path) => {
                saved_paths.push(path);
                page_metadata.push(PageInfo {
                    filename,
                    width: page.width,
                    height: page.height,
                });
            }
            Err(e) => {
                discard_partial(&saved_paths, &dir);
                return Err(e);
            }
        }
    }

    Ok((saved_paths, page_metadata))
}

/// Best-effort removal of pages written before a failure.
fn discard_partial(written: &[PathBuf], dir: &std::path::Path) {
    for path in written {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Could not remove partial page {}: {}", path.display(), e);
        }
    }
    // Only succeeds when nothing else lives there.
    if std::fs::remove_dir(dir).is_ok() {
        debug!("Removed empty document dir {}", dir.display());
    }
}

fn failure(
    document_id: String,
    error: IntakeError,
    service_time_seconds: f64,
    total_start: Instant,
) -> ConversionResult {
    let total_time_seconds = total_start.elapsed().as_secs_f64();
    let error_kind: ErrorKind = error.kind();
    warn!(
        "Conversion of {} failed ({}): {}",
        document_id, error_kind, error
    );
    ConversionResult::Error {
        document_id,
        error_kind,
        error_detail: error.to_string(),
        service_time_seconds,
        total_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([9, 9, 9, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn config_in(dir: &TempDir) -> ConversionConfig {
        ConversionConfig::builder()
            .output_root(dir.path())
            .build()
            .unwrap()
    }

    #[test]
    fn supplied_id_is_kept_and_blank_id_is_generated() {
        assert_eq!(resolve_document_id(Some("D-42")), "D-42");
        assert_eq!(resolve_document_id(Some("  D-42 ")), "D-42");

        let generated = resolve_document_id(Some("   "));
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
        assert_ne!(resolve_document_id(None), resolve_document_id(None));
    }

    #[test]
    fn image_upload_produces_one_page() {
        let tmp = TempDir::new().unwrap();
        let req = UploadRequest::new("receipt", png_bytes(30, 40)).with_document_id("r1");
        let result = convert_blocking(&req, &config_in(&tmp));

        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.document_id(), "r1");
        assert_eq!(result.saved_paths().len(), 1);
        assert_eq!(
            result.saved_paths()[0],
            tmp.path().join("r1").join("receipt_uploaded.png")
        );
        assert_eq!(
            result.page_metadata()[0],
            PageInfo {
                filename: "receipt_uploaded.png".into(),
                width: 30,
                height: 40,
            }
        );
        assert!(result.saved_paths()[0].exists());
        assert!(result.total_time_seconds() >= result.service_time_seconds());
    }

    #[test]
    fn undecodable_upload_is_an_error_result() {
        let tmp = TempDir::new().unwrap();
        let req = UploadRequest::new("receipt", b"garbage".to_vec());
        let result = convert_blocking(&req, &config_in(&tmp));

        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::Decode));
        assert!(result.error_detail().unwrap().contains("image"));
        assert!(result.saved_paths().is_empty());
        assert!(!result.document_id().is_empty());
        assert!(result.total_time_seconds() >= 0.0);
    }

    #[test]
    fn unwritable_output_root_is_a_filesystem_error() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the output directory should go.
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let config = ConversionConfig::builder()
            .output_root(&blocker)
            .build()
            .unwrap();

        let result = convert_blocking(&UploadRequest::new("scan", png_bytes(3, 3)), &config);
        assert_eq!(result.error_kind(), Some(ErrorKind::Filesystem));
    }

    #[test]
    fn encoded_upload_round_trip_and_bad_base64() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);

        let good = EncodedUpload {
            document_type: "id_card".into(),
            document: STANDARD.encode(png_bytes(5, 7)),
            document_id: Some("card-1".into()),
        };
        let result = convert_encoded_blocking(&good, &config);
        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.page_metadata()[0].height, 7);

        let bad = EncodedUpload {
            document_type: "id_card".into(),
            document: "%%%".into(),
            document_id: None,
        };
        let result = convert_encoded_blocking(&bad, &config);
        assert_eq!(result.error_kind(), Some(ErrorKind::Payload));
        assert_eq!(result.service_time_seconds(), 0.0);
    }

    #[test]
    fn encoded_upload_accepts_transport_field_names() {
        let upload: EncodedUpload = serde_json::from_str(
            r#"{"documenttype": "transcript", "document": "AAAA", "documentid": "t1"}"#,
        )
        .unwrap();
        assert_eq!(upload.document_type, "transcript");
        assert_eq!(upload.document_id.as_deref(), Some("t1"));
    }

    #[test]
    fn same_type_different_ids_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let a = convert_blocking(
            &UploadRequest::new("invoice", png_bytes(10, 10)).with_document_id("a"),
            &config,
        );
        let b = convert_blocking(
            &UploadRequest::new("invoice", png_bytes(20, 20)).with_document_id("b"),
            &config,
        );
        assert_ne!(a.saved_paths()[0], b.saved_paths()[0]);
        let reread = image::open(&a.saved_paths()[0]).unwrap();
        assert_eq!(reread.width(), 10);
    }

    #[test]
    fn async_convert_matches_blocking() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(convert(
            UploadRequest::new("scan", png_bytes(12, 8)).with_document_id("s1"),
            &config,
        ));
        assert!(result.is_success());
        assert_eq!(result.page_metadata()[0].width, 12);
    }
}
