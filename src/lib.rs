//! # edgequake-pdf2img
//!
//! Convert PDF pages to JPEG, PNG or WebP images.
//!
//! ## Why this crate?
//!
//! Turning a PDF into images sounds like one call to a rasteriser, but a
//! usable converter needs more around it: a page range that clamps sensibly,
//! a DPI that maps to a render scale, a background fill for formats without
//! alpha, optional grayscale or sepia output, and progress reporting that can
//! be cancelled mid-document. This crate is that layer. Rasterising itself is
//! delegated to pdfium through [`pipeline::render::RenderEngine`], so tests
//! and alternative backends can plug in their own engine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL, check type + size
//!  ├─ 2. Render   rasterise one page at a time via pdfium (worker thread)
//!  ├─ 3. Colour   optional grayscale / sepia, in place
//!  ├─ 4. Encode   JPEG / PNG / WebP → base64 data URI
//!  └─ 5. Output   ordered pages, progress events, ZIP or per-page files
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{ConversionSession, NoopProgressCallback, PdfSource, SettingsPatch, ImageFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = ConversionSession::with_pdfium();
//!     session.set_settings(&SettingsPatch::default().format(ImageFormat::Png).dpi(200))?;
//!
//!     let bytes = std::fs::read("document.pdf")?;
//!     let info = session.load(PdfSource::pdf("document.pdf", bytes)).await?;
//!     eprintln!("{} has {} pages", info.name, info.page_count);
//!
//!     session.convert(&NoopProgressCallback).await?;
//!     edgequake_pdf2img::export::write_images(&session.images(), "out").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2img = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a DPI
//!
//! | DPI | Scale | Best for |
//! |-----|-------|----------|
//! | 72  | 1.0   | Thumbnails, web previews |
//! | 96  | 1.33  | On-screen reading |
//! | 144 | 2.0   | Default, sharp on HiDPI screens |
//! | 200 | 2.78  | Printing |
//! | 300 | 4.17  | High-resolution print, OCR input |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Background, ColorMode, ImageFormat, SessionConfig, SessionConfigBuilder, Settings, SettingsPatch, Strictness,
};
pub use error::Pdf2ImgError;
pub use output::{CompletionSummary, ConversionReport, DocumentInfo, ProgressEvent, RenderedPage, RunOutcome};
pub use pipeline::input::PdfSource;
pub use pipeline::render::{DocumentHandle, PdfiumEngine, RenderEngine, RenderRequest};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{ConversionSession, RunState};
pub use stream::{convert_stream, ConversionEvent, EventStream};
