//! Configuration types for document conversion and validation.
//!
//! Conversion behaviour is controlled through [`ConversionConfig`], built via
//! its [`ConversionConfigBuilder`]; validation input loading through
//! [`ValidationConfig`]. The output root is an explicit value rather than an
//! implicit global so tests (and concurrent hosts) can point conversions at
//! their own directory.

use crate::error::IntakeError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory name used under the system temp dir when no output root is set.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "ocr_ai_uploads";

/// Column that identifies a document in ground-truth tables.
pub const DEFAULT_ID_COLUMN: &str = "documentId";

/// Configuration for converting uploads into page images.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr_intake::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .output_root("/tmp/pages")
///     .dpi(150)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Root directory for persisted pages. Each resolved document id gets its
    /// own subdirectory. Default: `$TMPDIR/ocr_ai_uploads`.
    pub output_root: PathBuf,

    /// PDF rendering resolution. Range: 72–400. Default: 72.
    ///
    /// At 72 DPI one PDF point maps to one pixel, which is the page's
    /// intrinsic pixel size.
    pub dpi: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit location of the pdfium shared library (file or directory).
    /// If None, `PDFIUM_LIB_PATH`, then `./`, then the system library are tried.
    pub pdfium_library_path: Option<PathBuf>,

    /// Number of uploads converted at once by
    /// [`crate::convert::convert_batch`]. Default: 4.
    pub concurrency: usize,

    /// Receives per-document events during batch conversion.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_root: std::env::temp_dir().join(DEFAULT_OUTPUT_DIR_NAME),
            dpi: 72,
            password: None,
            pdfium_library_path: None,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("output_root", &self.output_root)
            .field("dpi", &self.dpi)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Render scale relative to pdfium's native 72 DPI.
    pub fn render_scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn output_root(mut self, root: impl AsRef<Path>) -> Self {
        self.config.output_root = root.as_ref().to_path_buf();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.pdfium_library_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, IntakeError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(IntakeError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(IntakeError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.output_root.as_os_str().is_empty() {
            return Err(IntakeError::InvalidConfig(
                "Output root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for loading ground-truth tables.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Header of the column holding the document identifier.
    /// Default: `"documentId"`.
    pub id_column: String,

    /// Worksheet to read from spreadsheet ground truth. Default: first sheet.
    pub sheet: Option<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            sheet: None,
        }
    }
}

impl ValidationConfig {
    pub fn builder() -> ValidationConfigBuilder {
        ValidationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ValidationConfig`].
#[derive(Debug)]
pub struct ValidationConfigBuilder {
    config: ValidationConfig,
}

impl ValidationConfigBuilder {
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.config.id_column = column.into();
        self
    }

    pub fn sheet(mut self, sheet: impl Into<String>) -> Self {
        self.config.sheet = Some(sheet.into());
        self
    }

    pub fn build(self) -> Result<ValidationConfig, IntakeError> {
        if self.config.id_column.trim().is_empty() {
            return Err(IntakeError::InvalidConfig(
                "Id column name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
