//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `SettingsPatch`, drives a `ConversionSession` and writes the results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2img::config::DPI_PRESETS;
use edgequake_pdf2img::export::{archive_name, write_images, write_zip};
use edgequake_pdf2img::{
    Background, ColorMode, CompletionSummary, ConversionProgressCallback, ConversionReport, ConversionSession,
    DocumentInfo, ImageFormat, PdfiumEngine, ProgressEvent, RenderedPage, RunOutcome, SessionConfig, Settings,
    SettingsPatch, Strictness,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// converted page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Set once the first progress event tells us the page total.
    activated: AtomicBool,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner-only until the first `on_progress` reveals the total.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            activated: AtomicBool::new(false),
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting conversion of {total} pages…"))
        ));
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_progress(&self, event: ProgressEvent) {
        if !self.activated.swap(true, Ordering::SeqCst) {
            self.activate_bar(event.total);
        }
        *self.page_started.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.bar
            .set_message(format!("page {} ({}%)", event.page_num, event.percent));
    }

    fn on_page_done(&self, page: &RenderedPage, _index: usize) {
        let elapsed = self.page_elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}  {:<11}  {:<10}  {}",
            green("✓"),
            page.page_num,
            dim(&format!("{}x{}", page.width, page.height)),
            dim(&human_bytes(page.size_estimate)),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_complete(&self, summary: CompletionSummary) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages converted in {:.1}s",
            green("✔"),
            bold(&summary.total_pages.to_string()),
            summary.elapsed_secs
        );
    }

    fn on_error(&self, message: &str) {
        self.bar.abandon();
        // Truncate very long error messages to keep output tidy.
        let msg = match message.char_indices().nth(120) {
            Some((cut, _)) => format!("{}\u{2026}", &message[..cut]),
            None => message.to_string(),
        };
        eprintln!("{} {}", red("✘"), red(&msg));
    }
}

fn human_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    let n = n as f64;
    if n < KB {
        format!("{n} B")
    } else if n < KB * KB {
        format!("{:.1} KB", n / KB)
    } else {
        format!("{:.2} MB", n / (KB * KB))
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every page to JPEG at 144 DPI (writes report-images/page-N.jpg)
  pdf2img report.pdf

  # PNG with a transparent background, pages 3 to 7
  pdf2img --format png --background transparent --from 3 --to 7 slides.pdf

  # Print-quality grayscale, bundled into a ZIP archive
  pdf2img --preset print --color-mode grayscale --zip scan.pdf -o out/

  # Convert from URL
  pdf2img https://arxiv.org/pdf/1706.03762 --pages 1-2

  # Settings from a JSON file, overridden by flags
  pdf2img --settings settings.json --quality 80 document.pdf

  # Inspect page count only
  pdf2img --inspect-only document.pdf

DPI PRESETS:
  web       72   thumbnails, web previews
  screen    96   on-screen reading
  standard  144  default
  print     200  printing
  high-res  300  high-resolution print, OCR input

SETTINGS FILE (camelCase JSON, every key optional):
  {"format": "webp", "dpi": 200, "quality": 85, "background": "white",
   "colorMode": "sepia", "pageFrom": 2, "pageTo": null}

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium shared library
  RUST_LOG          Override log filter (e.g. edgequake_pdf2img=debug)

SETUP:
  pdf2img needs the pdfium shared library. Download a build for your
  platform from https://github.com/bblanchon/pdfium-binaries and either drop
  it next to the binary / in the working directory, install it system-wide,
  or point PDFIUM_LIB_PATH at it.
"#;

/// Convert PDF pages to JPEG, PNG or WebP images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Convert PDF pages to JPEG, PNG or WebP images",
    long_about = "Convert PDF documents (local files or URLs) to one image per page. \
Choose the format, DPI, quality, background fill, colour mode and page range; write \
individual files or a single ZIP archive.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output directory (default: <name>-images/, or the current directory with --zip).
    #[arg(short, long, env = "PDF2IMG_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Bundle all pages into <name>-images.zip instead of separate files.
    #[arg(long, env = "PDF2IMG_ZIP")]
    zip: bool,

    /// Output image format.
    #[arg(short, long, env = "PDF2IMG_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Rendering DPI (72–300). Default: 144.
    #[arg(long, env = "PDF2IMG_DPI", conflicts_with = "preset",
          value_parser = clap::value_parser!(u32).range(72..=300))]
    dpi: Option<u32>,

    /// Named DPI preset: web, screen, standard, print, high-res.
    #[arg(long, env = "PDF2IMG_PRESET")]
    preset: Option<String>,

    /// JPEG quality in percent (60–100). Default: 92.
    #[arg(long, env = "PDF2IMG_QUALITY",
          value_parser = clap::value_parser!(u8).range(60..=100))]
    quality: Option<u8>,

    /// Background fill under transparent regions.
    #[arg(long, env = "PDF2IMG_BACKGROUND", value_enum)]
    background: Option<BackgroundArg>,

    /// Post-render colour transform.
    #[arg(long, env = "PDF2IMG_COLOR_MODE", value_enum)]
    color_mode: Option<ColorModeArg>,

    /// First page to convert (1-indexed).
    #[arg(long, env = "PDF2IMG_FROM", conflicts_with = "pages")]
    from: Option<usize>,

    /// Last page to convert (1-indexed, inclusive).
    #[arg(long, env = "PDF2IMG_TO", conflicts_with = "pages")]
    to: Option<usize>,

    /// Page range shorthand: all, 5, or 3-15.
    #[arg(long, env = "PDF2IMG_PAGES")]
    pages: Option<String>,

    /// JSON settings file applied before the flags above.
    #[arg(long, env = "PDF2IMG_SETTINGS")]
    settings: Option<PathBuf>,

    /// Reject out-of-range DPI or quality from the settings file.
    #[arg(long, env = "PDF2IMG_STRICT")]
    strict: bool,

    /// Maximum accepted input size in MiB.
    #[arg(long, env = "PDF2IMG_MAX_SIZE_MB", default_value_t = 50)]
    max_size_mb: u64,

    /// Print a conversion report after writing the images.
    #[arg(long, env = "PDF2IMG_REPORT")]
    report: bool,

    /// Output a JSON summary on stdout.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Print document info only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2IMG_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to the pdfium shared library (overrides PDFIUM_LIB_PATH).
    #[arg(long, env = "PDF2IMG_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Jpg,
    Png,
    Webp,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpeg | FormatArg::Jpg => ImageFormat::Jpeg,
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Webp => ImageFormat::Webp,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackgroundArg {
    White,
    Transparent,
}

impl From<BackgroundArg> for Background {
    fn from(v: BackgroundArg) -> Self {
        match v {
            BackgroundArg::White => Background::White,
            BackgroundArg::Transparent => Background::Transparent,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ColorModeArg {
    Color,
    Grayscale,
    Sepia,
}

impl From<ColorModeArg> for ColorMode {
    fn from(v: ColorModeArg) -> Self {
        match v {
            ColorModeArg::Color => ColorMode::Color,
            ColorModeArg::Grayscale => ColorMode::Grayscale,
            ColorModeArg::Sepia => ColorMode::Sepia,
        }
    }
}

/// Machine-readable result printed with `--json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary<'a> {
    document: &'a DocumentInfo,
    settings: &'a Settings,
    pages: usize,
    elapsed_secs: f64,
    outputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Session ──────────────────────────────────────────────────────────
    let config = SessionConfig::builder()
        .max_file_size_mb(cli.max_size_mb)
        .strictness(if cli.strict {
            Strictness::Strict
        } else {
            Strictness::Lenient
        })
        .build()
        .context("Invalid configuration")?;

    let engine = match &cli.pdfium_lib {
        Some(path) => PdfiumEngine::with_library(path),
        None => PdfiumEngine::new(),
    };
    engine
        .probe()
        .context("PDFium library not found (set PDFIUM_LIB_PATH or see `pdf2img --help`)")?;
    let session = Arc::new(ConversionSession::new(Arc::new(engine), config));

    let patch = build_patch(&cli).await?;
    let applied = session
        .set_settings(&patch)
        .context("Invalid settings")?;
    if cli.quality.is_some() && !applied.format.is_lossy() && !cli.quiet {
        eprintln!(
            "{} --quality has no effect on {} output",
            dim("note:"),
            applied.format
        );
    }

    // ── Load ─────────────────────────────────────────────────────────────
    let info = session
        .load_input(&cli.input, cli.download_timeout)
        .await
        .context("Failed to load PDF")?;

    if cli.inspect_only {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:   {}", info.name);
            println!("Pages:  {}", info.page_count);
            println!("Size:   {}", human_bytes(info.size));
        }
        return Ok(());
    }

    // ── Convert ──────────────────────────────────────────────────────────
    // Ctrl-C resets the session; the run stops after its current page.
    let canceller = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                session.reset();
            }
        })
    };

    let settings = session.settings();
    let outcome = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        session.convert(cb.as_ref()).await
    } else {
        session.convert(&QuietCallback { quiet: cli.quiet }).await
    };
    canceller.abort();

    let summary = match outcome.context("Conversion failed")? {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::Abandoned => anyhow::bail!("Conversion interrupted"),
        RunOutcome::AlreadyRunning => anyhow::bail!("A conversion is already running"),
    };

    // ── Write ────────────────────────────────────────────────────────────
    let images = session.images();
    let outputs = if cli.zip {
        let dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let path = dir.join(archive_name(&info.name));
        write_zip(&images, &path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        vec![path]
    } else {
        let dir = cli
            .output_dir
            .clone()
            .unwrap_or_else(|| default_image_dir(&info.name));
        write_images(&images, &dir)
            .await
            .with_context(|| format!("Failed to write images to {}", dir.display()))?
    };

    if cli.json {
        let json = JsonSummary {
            document: &info,
            settings: &settings,
            pages: images.len(),
            elapsed_secs: summary.elapsed_secs,
            outputs,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        let target = match outputs.as_slice() {
            [single] if cli.zip => single.display().to_string(),
            _ => outputs
                .first()
                .and_then(|p| p.parent())
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };
        eprintln!(
            "{}  {} pages  {:.1}s  →  {}",
            green("✔"),
            images.len(),
            summary.elapsed_secs,
            bold(&target),
        );
    }

    if cli.report {
        let report = ConversionReport {
            file_name: Some(&info.name),
            page_count: info.page_count,
            settings: &settings,
            elapsed_secs: summary.elapsed_secs,
        };
        if cli.json {
            eprintln!("{report}");
        } else {
            println!("{report}");
        }
    }

    Ok(())
}

/// Plain stderr reporting used when the progress bar is off.
struct QuietCallback {
    quiet: bool,
}

impl ConversionProgressCallback for QuietCallback {
    fn on_page_done(&self, page: &RenderedPage, _index: usize) {
        if !self.quiet {
            eprintln!("  page {} → {}", page.page_num, page.file_name());
        }
    }

    fn on_error(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", red("✘"), message);
        }
    }
}

/// Map CLI args to a settings patch: settings file first, flags on top.
async fn build_patch(cli: &Cli) -> Result<SettingsPatch> {
    let file_patch = match cli.settings {
        Some(ref path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            serde_json::from_str::<SettingsPatch>(&text)
                .with_context(|| format!("Invalid settings file {:?}", path))?
        }
        None => SettingsPatch::default(),
    };

    let dpi = match cli.preset {
        Some(ref name) => Some(parse_preset(name)?),
        None => cli.dpi,
    };

    let (page_from, page_to) = match cli.pages {
        Some(ref range) => {
            let (from, to) = parse_pages(range)?;
            (Some(from), Some(to))
        }
        None => (cli.from, cli.to.map(Some)),
    };

    let flags = SettingsPatch {
        format: cli.format.map(Into::into),
        dpi,
        quality: cli.quality,
        background: cli.background.map(Into::into),
        color_mode: cli.color_mode.map(Into::into),
        page_from,
        page_to,
    };

    Ok(file_patch.then(flags))
}

fn parse_preset(name: &str) -> Result<u32> {
    let wanted = name.trim().to_lowercase();
    DPI_PRESETS
        .iter()
        .find(|(preset, _)| *preset == wanted)
        .map(|(_, dpi)| *dpi)
        .with_context(|| {
            let names: Vec<&str> = DPI_PRESETS.iter().map(|(n, _)| *n).collect();
            format!("Unknown DPI preset '{name}' (expected one of: {})", names.join(", "))
        })
}

/// Parse `--pages` into `(from, to)`; `to = None` means the last page.
fn parse_pages(s: &str) -> Result<(usize, Option<usize>)> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok((1, None));
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok((start, Some(end)));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok((page, Some(page)))
}

/// `report.pdf` → `report-images/`.
fn default_image_dir(document_name: &str) -> PathBuf {
    let archive = archive_name(document_name);
    let stem = archive.strip_suffix(".zip").unwrap_or(&archive);
    Path::new(stem).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_shorthand() {
        assert_eq!(parse_pages("all").unwrap(), (1, None));
        assert_eq!(parse_pages(" 3-15 ").unwrap(), (3, Some(15)));
        assert_eq!(parse_pages("5").unwrap(), (5, Some(5)));
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("9-2").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn presets_resolve_to_dpi() {
        assert_eq!(parse_preset("print").unwrap(), 200);
        assert_eq!(parse_preset("High-Res").unwrap(), 300);
        assert!(parse_preset("poster").is_err());
    }

    #[test]
    fn image_dir_follows_document_name() {
        assert_eq!(default_image_dir("deck.PDF"), PathBuf::from("deck-images"));
        assert_eq!(default_image_dir(""), PathBuf::from("converted-images"));
    }

    #[test]
    fn flags_override_settings_file() {
        let cli = Cli::parse_from(["pdf2img", "--format", "png", "--from", "2", "doc.pdf"]);
        let patch = tokio_test::block_on(build_patch(&cli)).unwrap();
        assert_eq!(patch.format, Some(ImageFormat::Png));
        assert_eq!(patch.page_from, Some(2));
        assert_eq!(patch.page_to, None);
        assert_eq!(patch.dpi, None);
    }

    #[test]
    fn cli_rejects_out_of_range_dpi() {
        assert!(Cli::try_parse_from(["pdf2img", "--dpi", "600", "doc.pdf"]).is_err());
        assert!(Cli::try_parse_from(["pdf2img", "--quality", "20", "doc.pdf"]).is_err());
    }
}
