//! The conversion session: one loaded document, its settings, and the
//! results of the most recent run.
//!
//! A [`ConversionSession`] owns everything a conversion needs. It is `Send +
//! Sync` and is usually shared behind an `Arc` so settings can be changed,
//! images read or [`ConversionSession::reset`] called while a run is in
//! progress on another task.
//!
//! ## Run lifecycle
//!
//! ```text
//!           convert()            all pages ok
//!   Idle ─────────────▶ Running ─────────────▶ Completed
//!    ▲                     │
//!    │ reset()/load()      │ range / render / encode error
//!    └─────────────────────┴──────────────────▶ Failed
//! ```
//!
//! A new run may start from any state except `Running`; asking for one while
//! running returns [`RunOutcome::AlreadyRunning`] and does nothing.
//!
//! `reset()` and a successful `load()` bump a generation counter. A run that
//! notices the counter moved stops after its current page, keeps nothing,
//! and returns [`RunOutcome::Abandoned`].

use crate::config::{SessionConfig, Settings, SettingsPatch, Strictness};
use crate::error::Pdf2ImgError;
use crate::output::{CompletionSummary, DocumentInfo, ProgressEvent, RenderedPage, RunOutcome};
use crate::pipeline::encode;
use crate::pipeline::input::{self, PdfSource};
use crate::pipeline::render::{DocumentHandle, PdfiumEngine, RenderEngine, RenderRequest};
use crate::progress::ConversionProgressCallback;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the session's most recent run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

struct LoadedDocument {
    handle: Arc<dyn DocumentHandle>,
    info: DocumentInfo,
}

#[derive(Default)]
struct SessionState {
    document: Option<LoadedDocument>,
    images: Vec<RenderedPage>,
    run: RunState,
    generation: u64,
}

/// A PDF-to-image conversion session.
pub struct ConversionSession {
    engine: Arc<dyn RenderEngine>,
    config: SessionConfig,
    settings: Mutex<Settings>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for ConversionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ConversionSession")
            .field("config", &self.config)
            .field("document", &state.document.as_ref().map(|d| &d.info))
            .field("images", &state.images.len())
            .field("run", &state.run)
            .finish()
    }
}

impl ConversionSession {
    pub fn new(engine: Arc<dyn RenderEngine>, config: SessionConfig) -> Self {
        let settings = config.initial_settings.clone();
        Self {
            engine,
            config,
            settings: Mutex::new(settings),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Session backed by [`PdfiumEngine::new`] with default configuration.
    pub fn with_pdfium() -> Self {
        Self::new(Arc::new(PdfiumEngine::new()), SessionConfig::default())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ── Settings ─────────────────────────────────────────────────────────

    /// Owned snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Merge `patch` into the current settings and return the result.
    ///
    /// Under [`Strictness::Strict`] an out-of-range DPI or quality is
    /// rejected and the current settings are left untouched. A run already
    /// in progress keeps the snapshot it started with.
    pub fn set_settings(&self, patch: &SettingsPatch) -> Result<Settings, Pdf2ImgError> {
        let mut current = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        let next = current.merged(patch);
        if self.config.strictness == Strictness::Strict {
            next.validate()?;
        }
        *current = next.clone();
        debug!("Settings updated: {:?}", next);
        Ok(next)
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Validate `source` and open it as the session's document.
    ///
    /// Validation runs before the engine sees any bytes. On success the
    /// previous document and its images are discarded; on failure they are
    /// kept.
    pub async fn load(&self, source: PdfSource) -> Result<DocumentInfo, Pdf2ImgError> {
        input::validate(&source, self.config.max_file_size)?;

        let PdfSource { name, bytes, .. } = source;
        let size = bytes.len() as u64;
        info!("Loading '{}' ({} bytes)", name, size);

        let handle = self.engine.open_document(bytes).await?;
        let info = DocumentInfo {
            page_count: handle.page_count(),
            name,
            size,
        };

        let mut state = self.state();
        state.document = Some(LoadedDocument {
            handle,
            info: info.clone(),
        });
        state.images.clear();
        state.run = RunState::Idle;
        state.generation += 1;
        Ok(info)
    }

    /// Resolve a local path or URL and [`load`](Self::load) it.
    pub async fn load_input(&self, input: &str, download_timeout_secs: u64) -> Result<DocumentInfo, Pdf2ImgError> {
        let source = input::resolve_input(input, download_timeout_secs, self.config.max_file_size).await?;
        self.load(source).await
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// Convert the configured page range of the loaded document.
    ///
    /// Events are delivered to `callback` in order: `on_progress` before each
    /// page and `on_page_done` after it, then exactly one of `on_complete` or
    /// `on_error`. Already-converted pages stay available through
    /// [`images`](Self::images) when a run fails part-way.
    ///
    /// # Errors
    /// - [`Pdf2ImgError::NoDocumentLoaded`] if nothing was loaded
    /// - [`Pdf2ImgError::InvalidRange`] if the clamped range is empty
    /// - [`Pdf2ImgError::RenderFailure`] / [`Pdf2ImgError::EncodeFailed`]
    ///   for the first page that fails
    pub async fn convert(&self, callback: &dyn ConversionProgressCallback) -> Result<RunOutcome, Pdf2ImgError> {
        let begun = {
            let mut state = self.state();
            match state.document.as_ref().map(|d| Arc::clone(&d.handle)) {
                None => None,
                Some(_) if state.run == RunState::Running => {
                    debug!("convert() ignored: a run is already in progress");
                    return Ok(RunOutcome::AlreadyRunning);
                }
                Some(handle) => {
                    state.run = RunState::Running;
                    state.images.clear();
                    state.generation += 1;
                    Some((handle, state.generation))
                }
            }
        };

        let Some((document, generation)) = begun else {
            let err = Pdf2ImgError::NoDocumentLoaded;
            callback.on_error(&err.to_string());
            return Err(err);
        };

        // Leaves `Running` if this future is dropped before finishing.
        let _guard = RunGuard {
            session: self,
            generation,
        };

        let settings = self.settings();
        let page_count = document.page_count();
        let (from, to) = match settings.page_range(page_count) {
            Ok(range) => range,
            Err(e) => {
                self.finish(generation, RunState::Failed);
                warn!("{}", e);
                callback.on_error(&e.to_string());
                return Err(e);
            }
        };

        let total = to - from + 1;
        let request = RenderRequest {
            scale: settings.scale(),
            background: settings.background,
        };
        info!(
            "Converting pages {}-{} of {} ({}, {} DPI, {})",
            from, to, page_count, settings.format, settings.dpi, settings.color_mode
        );

        let started = Instant::now();
        for (index, page_num) in (from..=to).enumerate() {
            callback.on_progress(ProgressEvent::new(index, total, page_num));

            let page = match convert_page(document.as_ref(), page_num, request, &settings).await {
                Ok(page) => page,
                Err(e) => {
                    if !self.finish(generation, RunState::Failed) {
                        warn!("Run abandoned while page {} was in flight", page_num);
                        return Ok(RunOutcome::Abandoned);
                    }
                    warn!("Conversion aborted: {}", e);
                    callback.on_error(&e.to_string());
                    return Err(e);
                }
            };

            {
                let mut state = self.state();
                if state.generation != generation {
                    drop(state);
                    warn!("Run abandoned after page {}; output discarded", page_num);
                    return Ok(RunOutcome::Abandoned);
                }
                state.images.push(page.clone());
            }
            callback.on_page_done(&page, index);
        }

        let summary = CompletionSummary::new(started.elapsed(), total);
        if !self.finish(generation, RunState::Completed) {
            warn!("Run abandoned before completion; output discarded");
            return Ok(RunOutcome::Abandoned);
        }

        info!(
            "Conversion complete: {} pages in {:.1}s",
            summary.total_pages, summary.elapsed_secs
        );
        callback.on_complete(summary);
        Ok(RunOutcome::Completed(summary))
    }

    // ── Reset & accessors ────────────────────────────────────────────────

    /// Drop the document and all results and return to `Idle`.
    ///
    /// Safe to call at any time, including mid-run and repeatedly.
    pub fn reset(&self) {
        let mut state = self.state();
        state.document = None;
        state.images.clear();
        state.run = RunState::Idle;
        state.generation += 1;
        debug!("Session reset");
    }

    /// Pages converted by the current (or last) run, in page order.
    pub fn images(&self) -> Vec<RenderedPage> {
        self.state().images.clone()
    }

    /// Page count of the loaded document, 0 when none is loaded.
    pub fn page_count(&self) -> usize {
        self.state()
            .document
            .as_ref()
            .map(|d| d.info.page_count)
            .unwrap_or(0)
    }

    pub fn document_info(&self) -> Option<DocumentInfo> {
        self.state().document.as_ref().map(|d| d.info.clone())
    }

    pub fn run_state(&self) -> RunState {
        self.state().run
    }

    pub fn is_converting(&self) -> bool {
        self.run_state() == RunState::Running
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move a run out of `Running`. Returns `false` when the run was
    /// superseded by a reset or a new load.
    fn finish(&self, generation: u64, outcome: RunState) -> bool {
        let mut state = self.state();
        if state.generation != generation {
            return false;
        }
        if state.run == RunState::Running {
            state.run = outcome;
        }
        true
    }
}

struct RunGuard<'a> {
    session: &'a ConversionSession,
    generation: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.session.finish(self.generation, RunState::Failed);
    }
}

/// Render one page, then colour-transform and encode it off the async pool.
async fn convert_page(
    document: &dyn DocumentHandle,
    page_num: usize,
    request: RenderRequest,
    settings: &Settings,
) -> Result<RenderedPage, Pdf2ImgError> {
    let bitmap = document.render_page(page_num, request).await?;
    debug!(
        "Page {} rendered at {}x{}",
        page_num,
        bitmap.width(),
        bitmap.height()
    );

    let settings = settings.clone();
    tokio::task::spawn_blocking(move || encode::finish_page(page_num, bitmap, &settings))
        .await
        .map_err(|e| Pdf2ImgError::Internal(format!("Encoding task for page {page_num} panicked: {e}")))?
}
