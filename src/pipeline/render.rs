//! Render engine boundary and the pdfium-backed implementation.
//!
//! The driver only sees two traits: [`RenderEngine`] opens a document from
//! bytes, and [`DocumentHandle`] reports its page count and rasterises one page
//! at a time into an RGBA bitmap. Anything that can do that (pdfium, a test
//! stub, a remote renderer) can drive a [`crate::session::ConversionSession`].
//!
//! ## Why a dedicated worker thread?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is not safe to call
//! from async contexts, and a `PdfDocument` borrows the `Pdfium` instance that
//! opened it. [`PdfiumEngine`] therefore spawns one OS thread per open
//! document. That thread owns both the library binding and the document for
//! its whole life and serves render requests over a channel, one at a time.
//! Dropping the [`DocumentHandle`] closes the channel, which closes the
//! document and ends the thread.

use crate::config::Background;
use crate::error::Pdf2ImgError;
use futures::future::BoxFuture;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Parameters for rasterising one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// Multiplier over native page size; 1.0 renders at 72 DPI.
    pub scale: f32,
    /// Colour the bitmap is cleared to before the page is drawn.
    pub background: Background,
}

/// Opens documents. One engine may open many documents over its lifetime.
pub trait RenderEngine: Send + Sync {
    /// Parse `bytes` and return a handle bound to the opened document.
    ///
    /// Failures are reported as [`Pdf2ImgError::RenderFailure`] with
    /// `page: None`.
    fn open_document(&self, bytes: Vec<u8>) -> BoxFuture<'_, Result<Arc<dyn DocumentHandle>, Pdf2ImgError>>;
}

/// An opened document. Callers never issue overlapping `render_page` calls.
pub trait DocumentHandle: Send + Sync {
    fn page_count(&self) -> usize;

    /// Rasterise `page_num` (1-indexed).
    fn render_page(&self, page_num: usize, request: RenderRequest) -> BoxFuture<'_, Result<RgbaImage, Pdf2ImgError>>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`RenderEngine`] backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Bind using `PDFIUM_LIB_PATH` when set, otherwise search the current
    /// directory and then the system library path.
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Bind to the library at an explicit path.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    /// Check that a pdfium library can be bound, without opening anything.
    pub fn probe(&self) -> Result<(), Pdf2ImgError> {
        bind_pdfium(self.library_path.as_deref()).map(|_| ())
    }
}

impl RenderEngine for PdfiumEngine {
    fn open_document(&self, bytes: Vec<u8>) -> BoxFuture<'_, Result<Arc<dyn DocumentHandle>, Pdf2ImgError>> {
        let library_path = self.library_path.clone();
        Box::pin(async move {
            let (ready_tx, ready_rx) = oneshot::channel();
            let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

            std::thread::Builder::new()
                .name("pdfium-worker".into())
                .spawn(move || worker_main(library_path, bytes, ready_tx, cmd_rx))
                .map_err(|e| Pdf2ImgError::Internal(format!("Failed to spawn pdfium worker: {e}")))?;

            let page_count = ready_rx
                .await
                .map_err(|_| Pdf2ImgError::Internal("pdfium worker exited during open".into()))??;

            info!("PDF loaded: {} pages", page_count);
            Ok(Arc::new(PdfiumDocument {
                page_count,
                commands: cmd_tx,
            }) as Arc<dyn DocumentHandle>)
        })
    }
}

struct RenderCommand {
    page_num: usize,
    request: RenderRequest,
    reply: oneshot::Sender<Result<RgbaImage, Pdf2ImgError>>,
}

/// A document held open by a pdfium worker thread.
struct PdfiumDocument {
    page_count: usize,
    commands: mpsc::UnboundedSender<RenderCommand>,
}

impl DocumentHandle for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render_page(&self, page_num: usize, request: RenderRequest) -> BoxFuture<'_, Result<RgbaImage, Pdf2ImgError>> {
        Box::pin(async move {
            let worker_gone = || Pdf2ImgError::RenderFailure {
                page: Some(page_num),
                detail: "pdfium worker is no longer running".into(),
            };
            let (reply, response) = oneshot::channel();
            self.commands
                .send(RenderCommand {
                    page_num,
                    request,
                    reply,
                })
                .map_err(|_| worker_gone())?;
            response.await.map_err(|_| worker_gone())?
        })
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, Pdf2ImgError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2ImgError::PdfiumBindingFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

fn worker_main(
    library_path: Option<PathBuf>,
    bytes: Vec<u8>,
    ready: oneshot::Sender<Result<usize, Pdf2ImgError>>,
    mut commands: mpsc::UnboundedReceiver<RenderCommand>,
) {
    let pdfium = match bind_pdfium(library_path.as_deref()) {
        Ok(pdfium) => pdfium,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let document = match pdfium.load_pdf_from_byte_vec(bytes, None) {
        Ok(document) => document,
        Err(e) => {
            let _ = ready.send(Err(Pdf2ImgError::RenderFailure {
                page: None,
                detail: format!("{e:?}"),
            }));
            return;
        }
    };

    let pages = document.pages();
    if ready.send(Ok(pages.len() as usize)).is_err() {
        return;
    }

    while let Some(cmd) = commands.blocking_recv() {
        let result = render_one(pages, cmd.page_num, &cmd.request);
        // The requester may have gone away; the bitmap is simply dropped.
        let _ = cmd.reply.send(result);
    }

    debug!("pdfium worker: document closed");
}

fn render_one(pages: &PdfPages, page_num: usize, request: &RenderRequest) -> Result<RgbaImage, Pdf2ImgError> {
    let fail = |detail: String| Pdf2ImgError::RenderFailure {
        page: Some(page_num),
        detail,
    };

    let index = page_num
        .checked_sub(1)
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| fail(format!("page {page_num} is not addressable")))?;

    let page = pages.get(index).map_err(|e| fail(format!("{e:?}")))?;

    let [r, g, b, a] = request.background.clear_color();
    let config = PdfRenderConfig::new()
        .scale_page_by_factor(request.scale)
        .set_clear_color(PdfColor::new(r, g, b, a));

    let bitmap = page.render_with_config(&config).map_err(|e| fail(format!("{e:?}")))?;
    let image = bitmap.as_image().into_rgba8();
    debug!(
        "Rendered page {} → {}x{} px",
        page_num,
        image.width(),
        image.height()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_library_path_is_used_as_is() {
        let engine = PdfiumEngine::with_library("/nonexistent/libpdfium.so");
        assert_eq!(engine.library_path.as_deref(), Some(Path::new("/nonexistent/libpdfium.so")));
        assert!(matches!(engine.probe(), Err(Pdf2ImgError::PdfiumBindingFailed(_))));
    }
}
