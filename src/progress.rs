//! Progress-callback trait for conversion events.
//!
//! Pass any [`ConversionProgressCallback`] to
//! [`crate::session::ConversionSession::convert`] to receive events as the
//! driver works through the page range. Callbacks are invoked synchronously
//! from the driver task, in order: one `on_progress` before each page, one
//! `on_page_done` after it, then exactly one of `on_complete` or `on_error`.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::{ConversionProgressCallback, ProgressEvent, RenderedPage};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_done(&self, page: &RenderedPage, _index: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {} → {} bytes", page.page_num, page.size_estimate);
//!     }
//! }
//! ```

use crate::output::{CompletionSummary, ProgressEvent, RenderedPage};
use std::sync::Arc;

/// Receives conversion events. Every method defaults to a no-op.
///
/// `Send + Sync` so callbacks can be shared with a spawned conversion task
/// (see [`crate::stream::convert_stream`]).
pub trait ConversionProgressCallback: Send + Sync {
    /// Called before a page starts rendering.
    fn on_progress(&self, event: ProgressEvent) {
        let _ = event;
    }

    /// Called after a page has been rendered, encoded and stored.
    ///
    /// # Arguments
    /// * `page`: the converted page
    /// * `index`: 0-indexed position of the page within the run
    fn on_page_done(&self, page: &RenderedPage, index: usize) {
        let _ = (page, index);
    }

    /// Called once after every page in range converted successfully.
    fn on_complete(&self, summary: CompletionSummary) {
        let _ = summary;
    }

    /// Called once when the run fails; `message` is human-readable.
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Shared callback handle.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

impl<T: ConversionProgressCallback + ?Sized> ConversionProgressCallback for Arc<T> {
    fn on_progress(&self, event: ProgressEvent) {
        (**self).on_progress(event);
    }

    fn on_page_done(&self, page: &RenderedPage, index: usize) {
        (**self).on_page_done(page, index);
    }

    fn on_complete(&self, summary: CompletionSummary) {
        (**self).on_complete(summary);
    }

    fn on_error(&self, message: &str) {
        (**self).on_error(message);
    }
}
