//! Error types for the edgequake-pdf2img library.
//!
//! A single enum, [`Pdf2ImgError`], covers every failure the library can
//! report. Loader failures ([`Pdf2ImgError::InvalidFormat`],
//! [`Pdf2ImgError::TooLarge`]) are raised before the render engine is ever
//! touched. Run failures ([`Pdf2ImgError::InvalidRange`],
//! [`Pdf2ImgError::RenderFailure`], [`Pdf2ImgError::EncodeFailed`]) abort the
//! remaining pages of a run but leave already-converted pages readable
//! through [`crate::session::ConversionSession::images`].
//!
//! Nothing is retried. A single render failure is terminal for its run.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Loader errors ─────────────────────────────────────────────────────
    /// Declared content type of the input is not `application/pdf`.
    #[error("Only PDF files are accepted ('{name}' is {declared_type})")]
    InvalidFormat { name: String, declared_type: String },

    /// Input exceeds the configured size ceiling.
    #[error("File '{name}' is {size} bytes; the maximum is {limit} bytes ({limit_mb} MB)")]
    TooLarge {
        name: String,
        size: u64,
        limit: u64,
        limit_mb: u64,
    },

    // ── Run errors ────────────────────────────────────────────────────────
    /// Conversion was requested before a document was loaded.
    #[error("No PDF document loaded")]
    NoDocumentLoaded,

    /// Clamped page range is empty (`from > to`).
    #[error("Invalid page range: {from}-{to} (document has {total} pages)")]
    InvalidRange { from: usize, to: usize, total: usize },

    /// The render engine failed to open the document or render a page.
    ///
    /// `page` is `None` when the failure happened while opening.
    #[error("{}", render_failure_message(.page, .detail))]
    RenderFailure { page: Option<usize>, detail: String },

    /// The rendered bitmap could not be encoded to the target format.
    #[error("Encoding page {page} failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output image or archive.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// ZIP construction failed.
    #[error("Failed to build ZIP archive: {0}")]
    ArchiveFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Settings or session configuration rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the binary or in the current directory.\n\
  • Install pdfium system-wide (pre-built: github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn render_failure_message(page: &Option<usize>, detail: &str) -> String {
    match page {
        Some(page) => format!("Conversion failed on page {page}: {detail}"),
        None => format!("Failed to open PDF: {detail}"),
    }
}
