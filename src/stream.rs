//! Streaming conversion API: pull conversion events instead of receiving
//! callbacks.
//!
//! [`convert_stream`] is lazy: the first poll starts a run on a spawned task,
//! which forwards every callback as a [`ConversionEvent`] through a channel. The stream ends once
//! the run has finished, so a complete run always yields its final
//! `Completed`, `Failed`, `AlreadyRunning` or `Abandoned` event last.
//!
//! Dropping the stream does not cancel the run; use
//! [`ConversionSession::reset`] for that.

use crate::output::{CompletionSummary, ProgressEvent, RenderedPage, RunOutcome};
use crate::progress::ConversionProgressCallback;
use crate::session::ConversionSession;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

/// One event of a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    Progress(ProgressEvent),
    PageDone { page: RenderedPage, index: usize },
    Completed(CompletionSummary),
    /// The run failed; carries the same message `on_error` receives.
    Failed(String),
    AlreadyRunning,
    Abandoned,
}

impl ConversionEvent {
    /// `true` for the event that ends a run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConversionEvent::Progress(_) | ConversionEvent::PageDone { .. })
    }
}

/// A boxed stream of conversion events.
pub type EventStream = Pin<Box<dyn Stream<Item = ConversionEvent> + Send>>;

struct ChannelCallback {
    tx: mpsc::UnboundedSender<ConversionEvent>,
}

impl ChannelCallback {
    fn emit(&self, event: ConversionEvent) {
        // A receiver that went away just stops listening.
        let _ = self.tx.send(event);
    }
}

impl ConversionProgressCallback for ChannelCallback {
    fn on_progress(&self, event: ProgressEvent) {
        self.emit(ConversionEvent::Progress(event));
    }

    fn on_page_done(&self, page: &RenderedPage, index: usize) {
        self.emit(ConversionEvent::PageDone {
            page: page.clone(),
            index,
        });
    }

    fn on_complete(&self, summary: CompletionSummary) {
        self.emit(ConversionEvent::Completed(summary));
    }

    fn on_error(&self, message: &str) {
        self.emit(ConversionEvent::Failed(message.to_string()));
    }
}

/// Stream the events of a run of `session`.
///
/// Nothing happens until the stream is first polled, which must happen
/// inside a tokio runtime.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2img::{convert_stream, ConversionEvent, ConversionSession, PdfSource};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Arc::new(ConversionSession::with_pdfium());
/// session.load(PdfSource::pdf("doc.pdf", std::fs::read("doc.pdf")?)).await?;
///
/// let mut events = convert_stream(Arc::clone(&session));
/// while let Some(event) = events.next().await {
///     if let ConversionEvent::PageDone { page, .. } = event {
///         println!("page {} → {} bytes", page.page_num, page.size_estimate);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn convert_stream(session: Arc<ConversionSession>) -> EventStream {
    let started = futures::stream::once(async move {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_to_channel(session, tx));
        UnboundedReceiverStream::new(rx)
    });
    Box::pin(started.flatten())
}

async fn run_to_channel(session: Arc<ConversionSession>, tx: mpsc::UnboundedSender<ConversionEvent>) {
    let callback = ChannelCallback { tx };
    let terminal = match session.convert(&callback).await {
        Ok(RunOutcome::AlreadyRunning) => Some(ConversionEvent::AlreadyRunning),
        Ok(RunOutcome::Abandoned) => Some(ConversionEvent::Abandoned),
        // Completion and failures were already forwarded by the callback.
        Ok(RunOutcome::Completed(_)) | Err(_) => None,
    };
    if let Some(event) = terminal {
        callback.emit(event);
    }
    debug!("convert_stream: run finished");
}
