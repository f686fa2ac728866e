//! Pipeline stages for upload normalisation.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the orchestrator in [`crate::convert`] stays a
//! thin sequence of calls.
//!
//! ## Data Flow
//!
//! ```text
//! payload ──▶ render ──▶ persist
//! (base64,     (pdfium /   (PNG, one dir
//!  %PDF sniff)  image)      per document)
//! ```
//!
//! 1. [`payload`]: decode the transport encoding and classify the bytes
//! 2. [`render`] : rasterise to RGB pages; pure, never touches disk
//! 3. [`persist`]: name pages deterministically and write them atomically

pub mod payload;
pub mod persist;
pub mod render;
