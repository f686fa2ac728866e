//! Page rasterisation: raw payload bytes → ordered RGB page images.
//!
//! PDFs are rendered page by page through pdfium; anything else is decoded
//! as a single raster image by the `image` crate. Both paths end in 8-bit
//! RGB so downstream OCR sees one pixel format regardless of the source's
//! channel depth or alpha.
//!
//! This stage is pure: it never touches the filesystem. pdfium calls are
//! blocking and CPU-bound; async callers go through
//! [`crate::convert::convert`], which moves the work to `spawn_blocking`.

use crate::config::ConversionConfig;
use crate::error::IntakeError;
use crate::pipeline::payload::SourceKind;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed position in the source document.
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: RgbImage,
}

impl PageImage {
    fn new(index: usize, pixels: RgbImage) -> Self {
        Self {
            index,
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        }
    }
}

/// Output of [`rasterize`].
#[derive(Debug, Clone)]
pub struct Rasterized {
    pub pages: Vec<PageImage>,
    pub source: SourceKind,
}

impl Rasterized {
    pub fn is_paginated(&self) -> bool {
        self.source.is_paginated()
    }
}

/// Rasterise a payload into page images.
///
/// # Errors
/// * [`IntakeError::Decode`] if the bytes are not a readable PDF / image.
/// * [`IntakeError::PdfiumBindingFailed`] if a PDF arrives and pdfium
///   cannot be loaded.
pub fn rasterize(raw: &[u8], config: &ConversionConfig) -> Result<Rasterized, IntakeError> {
    let source = SourceKind::sniff(raw);
    let pages = match source {
        SourceKind::Pdf => render_pdf(raw, config)?,
        SourceKind::Image => vec![decode_image(raw)?],
    };
    Ok(Rasterized { pages, source })
}

/// Decode a single raster image and force it to RGB8.
fn decode_image(raw: &[u8]) -> Result<PageImage, IntakeError> {
    let img = image::load_from_memory(raw).map_err(|e| IntakeError::Decode {
        source_kind: SourceKind::Image,
        detail: e.to_string(),
    })?;
    debug!(
        "Decoded image {}x{} ({:?}) → RGB8",
        img.width(),
        img.height(),
        img.color()
    );
    Ok(PageImage::new(1, img.into_rgb8()))
}

fn render_pdf(raw: &[u8], config: &ConversionConfig) -> Result<Vec<PageImage>, IntakeError> {
    let pdfium = bind_pdfium(config.pdfium_library_path.as_deref())?;

    let document = pdfium
        .load_pdf_from_byte_slice(raw, config.password.as_deref())
        .map_err(|e| pdf_decode_error(format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(pdf_decode_error("document has no pages".into()));
    }
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(config.render_scale())
        .render_form_data(true);

    let mut results = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| pdf_decode_error(format!("page {}: {:?}", idx + 1, e)))?;

        let image = bitmap.as_image().into_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push(PageImage::new(idx + 1, image));
    }

    Ok(results)
}

fn pdf_decode_error(detail: String) -> IntakeError {
    IntakeError::Decode {
        source_kind: SourceKind::Pdf,
        detail,
    }
}

/// Bind to pdfium, most specific location first.
///
/// 1. `explicit` (a library file or a directory containing it)
/// 2. `PDFIUM_LIB_PATH`
/// 3. the working directory
/// 4. the system library search path
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, IntakeError> {
    let env_path = std::env::var_os("PDFIUM_LIB_PATH").map(std::path::PathBuf::from);

    let bindings = match explicit.or(env_path.as_deref()) {
        Some(path) => bind_at(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| IntakeError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn bind_at(path: &Path) -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
    if path.is_dir() {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
    } else {
        Pdfium::bind_to_library(path)
    }
}
