//! CLI binary for ocr-intake.
//!
//! A thin shim over the library crate: `convert` maps flags to
//! `ConversionConfig` and runs a batch conversion, `validate` loads ground
//! truth and OCR output and prints the accuracy tables.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use ocr_intake::validate::{export, format_percent, ValidationRun};
use ocr_intake::{
    convert_batch, convert_encoded_batch, validate_files, ConversionConfig,
    ConversionProgressCallback, ConversionResult, EncodedUpload, ProgressCallback, UploadRequest,
    ValidationConfig,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the uploads of one batch. Documents finish out of order,
/// so each completion is logged above the bar as it happens.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} uploads  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
    }

    fn on_document_start(&self, document_type: &str) {
        self.bar.set_message(document_type.to_string());
    }

    fn on_document_complete(&self, document_id: &str, pages: usize, seconds: f64) {
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            document_id,
            dim(&format!("{pages:>3} page(s)")),
            dim(&format!("{seconds:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, document_id: &str, detail: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        // First line only; pdfium errors can span several.
        let first = detail.lines().next().unwrap_or(detail);
        self.bar
            .println(format!("  {} {}  {}", red("✗"), document_id, red(first)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_documents.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} upload(s) converted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} upload(s) converted  ({} failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rasterise a PDF into page images
  ocr-intake convert --type transcript transcript.pdf

  # Several scans at once, custom output root, JSON results
  ocr-intake convert --type receipt --out ./pages --json a.jpg b.png c.tiff

  # Upload already base64-encoded by a front-end
  ocr-intake convert --type invoice --base64 --id INV-001 invoice.b64

  # Score OCR output against ground truth
  ocr-intake validate --ground-truth truth.csv --ocr ocr.json

  # Same, exporting CSV tables
  ocr-intake validate --ground-truth truth.xlsx --ocr ocr.json --export ./report

OUTPUT LAYOUT:
  <out>/<documentId>/<type>_page<N>.png     pages of a PDF
  <out>/<documentId>/<type>_uploaded.png    a single image

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH      Path to libpdfium (file or directory). Needed for PDFs.
  RUST_LOG             Override log filter (e.g. ocr_intake=debug)
"#;

/// Normalise uploads into OCR-ready page images and score OCR output.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-intake",
    version,
    about = "Normalise uploads into OCR-ready page images and score OCR output",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OCR_INTAKE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "OCR_INTAKE_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "OCR_INTAKE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert uploads (PDFs or images) into page images.
    Convert(ConvertArgs),
    /// Score OCR output against a ground-truth table.
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Files to convert. Each file is one upload.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Document type label, used as the page filename prefix.
    #[arg(short = 't', long = "type", env = "OCR_INTAKE_DOCUMENT_TYPE")]
    document_type: String,

    /// Document id (single file only). Generated when omitted.
    #[arg(long)]
    id: Option<String>,

    /// Files contain base64 text rather than raw bytes.
    #[arg(long)]
    base64: bool,

    /// Output root directory. Default: $TMPDIR/ocr_ai_uploads.
    #[arg(short, long, env = "OCR_INTAKE_OUTPUT")]
    out: Option<PathBuf>,

    /// PDF rendering DPI (72–400).
    #[arg(long, env = "OCR_INTAKE_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCR_INTAKE_PASSWORD")]
    password: Option<String>,

    /// Location of the pdfium library (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Number of uploads converted at once.
    #[arg(short, long, env = "OCR_INTAKE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Ground-truth table (.csv, .xlsx, .xls, .ods).
    #[arg(short = 'g', long)]
    ground_truth: PathBuf,

    /// OCR output JSON (one document object or a list of them).
    #[arg(short = 'r', long)]
    ocr: PathBuf,

    /// Ground-truth column holding the document id.
    #[arg(long, default_value = "documentId")]
    id_column: String,

    /// Spreadsheet worksheet to read. Default: first sheet.
    #[arg(long)]
    sheet: Option<String>,

    /// Print the full run as JSON.
    #[arg(long)]
    json: bool,

    /// Write CSV tables into this directory.
    #[arg(long)]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let json = match &cli.command {
        Command::Convert(a) => a.json,
        Command::Validate(a) => a.json,
    };
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !json
        && matches!(cli.command, Command::Convert(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Convert(ref args) => run_convert(args, show_progress, cli.quiet).await,
        Command::Validate(ref args) => run_validate(args, cli.quiet),
    }
}

async fn run_convert(args: &ConvertArgs, show_progress: bool, quiet: bool) -> Result<ExitCode> {
    if args.id.is_some() && args.files.len() > 1 {
        anyhow::bail!("--id can only be used with a single file");
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(args, progress)?;

    let results = if args.base64 {
        // Undecodable base64 becomes an error result for that file alone.
        let mut uploads = Vec::with_capacity(args.files.len());
        for path in &args.files {
            let document = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            uploads.push(EncodedUpload {
                document_type: args.document_type.clone(),
                document,
                document_id: args.id.clone(),
            });
        }
        convert_encoded_batch(uploads, &config).await
    } else {
        let mut requests = Vec::with_capacity(args.files.len());
        for path in &args.files {
            let raw = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let mut request = UploadRequest::new(&args.document_type, raw);
            if let Some(ref id) = args.id {
                request = request.with_document_id(id);
            }
            requests.push(request);
        }
        convert_batch(requests, &config).await
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialise results")?
        );
    } else {
        for (path, result) in args.files.iter().zip(&results) {
            print_conversion(path, result);
        }
        if !quiet && !show_progress {
            let ok = results.iter().filter(|r| r.is_success()).count();
            eprintln!("Converted {}/{} upload(s)", ok, results.len());
        }
    }

    Ok(if results.iter().all(ConversionResult::is_success) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `ConversionConfig`.
fn build_config(args: &ConvertArgs, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(args.dpi)
        .concurrency(args.concurrency);

    if let Some(ref out) = args.out {
        builder = builder.output_root(out);
    }
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd);
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_conversion(input: &std::path::Path, result: &ConversionResult) {
    match result {
        ConversionResult::Success {
            document_id,
            saved_paths,
            page_metadata,
            service_time_seconds,
            total_time_seconds,
        } => {
            println!(
                "{} {}  {}  {}",
                green("✓"),
                bold(&input.display().to_string()),
                document_id,
                dim(&format!(
                    "service {service_time_seconds:.3}s / total {total_time_seconds:.3}s"
                )),
            );
            for (path, page) in saved_paths.iter().zip(page_metadata) {
                println!(
                    "    {:>5} x {:<5}  {}",
                    page.width,
                    page.height,
                    path.display()
                );
            }
        }
        ConversionResult::Error {
            document_id,
            error_kind,
            error_detail,
            total_time_seconds,
            ..
        } => {
            println!(
                "{} {}  {}  {}  {}",
                red("✗"),
                bold(&input.display().to_string()),
                document_id,
                red(&format!("[{error_kind}] {error_detail}")),
                dim(&format!("{total_time_seconds:.3}s")),
            );
        }
    }
}

fn run_validate(args: &ValidateArgs, quiet: bool) -> Result<ExitCode> {
    let mut builder = ValidationConfig::builder().id_column(&args.id_column);
    if let Some(ref sheet) = args.sheet {
        builder = builder.sheet(sheet);
    }
    let config = builder.build().context("Invalid configuration")?;

    let run = validate_files(&args.ground_truth, &args.ocr, &config)
        .context("Validation failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&run).context("Failed to serialise validation run")?
        );
    } else {
        print_validation(&run);
    }

    if let Some(ref dir) = args.export {
        let written = export::write_report_csv(dir, &run).context("Export failed")?;
        if !quiet {
            for path in written {
                eprintln!("{} {}", green("✔"), path.display());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_validation(run: &ValidationRun) {
    let report = &run.report;

    println!("{}", bold("Validation Metrics"));
    println!(
        "  Overall accuracy: {}  {}",
        bold(&format_percent(report.overall_accuracy)),
        dim(&format!("({} document(s) scored)", report.documents_scored)),
    );

    if let Some(notice) = empty_run_notice(run) {
        println!();
        println!("{notice}");
    } else {
        println!();
        println!("{}", bold("Document-level Accuracy"));
        print_table(
            &["documentId", "accuracy (%)"],
            report
                .per_document_accuracy
                .iter()
                .map(|(id, acc)| vec![id.clone(), format_percent(*acc)])
                .collect(),
        );

        println!();
        println!("{}", bold("Field-wise Accuracy"));
        print_table(
            &["field_name", "accuracy (%)"],
            report
                .per_field_accuracy
                .iter()
                .map(|(name, acc)| vec![name.clone(), format_percent(Some(*acc))])
                .collect(),
        );

        println!();
        println!("{}", bold("Field-Level Comparison"));
        print_table(
            &["documentId", "field_name", "ground_truth", "ocr_value", "confidence", "match"],
            run.comparisons
                .iter()
                .map(|c| {
                    vec![
                        c.document_id.clone(),
                        c.field_name.clone(),
                        c.ground_truth_value.clone().unwrap_or_default(),
                        c.ocr_value.clone(),
                        c.confidence_score
                            .map(|s| format!("{s:.2}"))
                            .unwrap_or_default(),
                        if c.is_match { "✓".into() } else { "✗".into() },
                    ]
                })
                .collect(),
        );
    }

    if !run.unmatched_documents.is_empty() {
        println!();
        println!(
            "{} {} ground-truth document(s) had no OCR output and were not scored: {}",
            cyan("⚠"),
            run.unmatched_documents.len(),
            run.unmatched_documents.join(", ")
        );
    }
}

/// Why there are no tables to print, if there are none.
fn empty_run_notice(run: &ValidationRun) -> Option<&'static str> {
    if run.report.documents_scored == 0 {
        Some("No matching documents found for validation.")
    } else if run.comparisons.is_empty() {
        Some("Matched documents had no ground-truth fields to compare.")
    } else {
        None
    }
}

/// Left-aligned plain-text table.
fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect();
        println!("  {}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|w| "─".repeat(*w)).collect());
    for row in rows {
        line(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocr_intake::validate::{aggregate, ExtractedField, GroundTruthRecord, OcrDocument};

    #[test]
    fn notice_distinguishes_unmatched_from_fieldless() {
        let unmatched = aggregate(&[GroundTruthRecord::new("D1").field("grade", "A")], &[]);
        assert_eq!(
            empty_run_notice(&unmatched),
            Some("No matching documents found for validation.")
        );

        let fieldless = aggregate(
            &[GroundTruthRecord::new("D1")],
            &[OcrDocument::new("D1", vec![ExtractedField::new("grade", "A")])],
        );
        assert_eq!(fieldless.report.documents_scored, 1);
        assert_eq!(
            empty_run_notice(&fieldless),
            Some("Matched documents had no ground-truth fields to compare.")
        );

        let scored = aggregate(
            &[GroundTruthRecord::new("D1").field("grade", "A")],
            &[OcrDocument::new("D1", vec![ExtractedField::new("grade", "a")])],
        );
        assert_eq!(empty_run_notice(&scored), None);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
