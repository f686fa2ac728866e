//! Progress-callback trait for batch conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as [`crate::convert::convert_batch`] works through its uploads.
//!
//! # Example
//!
//! ```rust
//! use ocr_intake::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, document_id: &str, pages: usize, seconds: f64) {
//!         self.pages.fetch_add(pages, Ordering::SeqCst);
//!         eprintln!("{document_id}: {pages} pages in {seconds:.2}s");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { pages: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by batch conversion as it processes each upload.
///
/// Uploads are converted concurrently, so every method except
/// `on_batch_start` / `on_batch_complete` may be called from several threads
/// at once. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any upload is converted.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when an upload is handed to the rasteriser.
    fn on_document_start(&self, document_type: &str) {
        let _ = document_type;
    }

    /// Called when an upload converted successfully.
    ///
    /// # Arguments
    /// * `document_id`: resolved id (caller-supplied or generated)
    /// * `pages`      : number of page images written
    /// * `seconds`    : total conversion time
    fn on_document_complete(&self, document_id: &str, pages: usize, seconds: f64) {
        let _ = (document_id, pages, seconds);
    }

    /// Called when an upload produced an error result.
    fn on_document_error(&self, document_id: &str, detail: &str) {
        let _ = (document_id, detail);
    }

    /// Called once after every upload has been attempted.
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
