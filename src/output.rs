//! Result types produced by a conversion run.

use crate::config::{ImageFormat, Settings};
use crate::error::Pdf2ImgError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of a successfully loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Number of pages reported by the render engine.
    pub page_count: usize,
    /// Originating file name (or last URL path segment).
    pub name: String,
    /// Size of the input in bytes.
    pub size: u64,
}

/// One converted page.
///
/// `data_url` is self-describing (`data:<mime>;base64,<payload>`) and can be
/// embedded or downloaded without further decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    pub data_url: String,
    pub ext: String,
    pub mime: String,
    pub width: u32,
    pub height: u32,
    /// Approximate encoded size: `data_url.len() * 0.75`.
    pub size_estimate: u64,
}

impl RenderedPage {
    /// Package encoded image bytes as a page.
    pub fn from_encoded(page_num: usize, format: ImageFormat, width: u32, height: u32, bytes: &[u8]) -> Self {
        let data_url = format!("data:{};base64,{}", format.mime(), STANDARD.encode(bytes));
        let size_estimate = (data_url.len() as f64 * 0.75).round() as u64;
        Self {
            page_num,
            data_url,
            ext: format.extension().to_string(),
            mime: format.mime().to_string(),
            width,
            height,
            size_estimate,
        }
    }

    /// Default file name for this page: `page-<N>.<ext>`.
    pub fn file_name(&self) -> String {
        format!("page-{}.{}", self.page_num, self.ext)
    }

    /// Decode the base64 payload of `data_url` back to raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, Pdf2ImgError> {
        let payload = self
            .data_url
            .split_once(',')
            .map(|(_, b64)| b64)
            .ok_or_else(|| Pdf2ImgError::Internal(format!("page {} has a malformed data URL", self.page_num)))?;
        STANDARD
            .decode(payload)
            .map_err(|e| Pdf2ImgError::Internal(format!("page {}: invalid base64 payload: {e}", self.page_num)))
    }
}

/// Emitted before each page starts rendering.
///
/// `percent` is computed from pages already completed, so the first event
/// reads 0 and the last reads `(total - 1) / total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub percent: u8,
    /// 1-indexed position of this page within the run.
    pub current_index: usize,
    pub total: usize,
    pub page_num: usize,
}

impl ProgressEvent {
    pub(crate) fn new(completed: usize, total: usize, page_num: usize) -> Self {
        let percent = if total == 0 { 0 } else { (completed * 100 / total) as u8 };
        Self {
            percent,
            current_index: completed + 1,
            total,
            page_num,
        }
    }
}

/// Emitted once when every page of a run has been converted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    /// Wall-clock seconds, rounded to one decimal place.
    pub elapsed_secs: f64,
    pub total_pages: usize,
}

impl CompletionSummary {
    pub(crate) fn new(elapsed: std::time::Duration, total_pages: usize) -> Self {
        Self {
            elapsed_secs: (elapsed.as_secs_f64() * 10.0).round() / 10.0,
            total_pages,
        }
    }
}

/// How a call to [`crate::session::ConversionSession::convert`] ended
/// without an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// Every page in range was converted.
    Completed(CompletionSummary),
    /// Another run was already in progress; nothing was done.
    AlreadyRunning,
    /// `reset()` or a new `load()` happened mid-run; output was discarded.
    Abandoned,
}

/// Plain-text report of a finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport<'a> {
    pub file_name: Option<&'a str>,
    pub page_count: usize,
    pub settings: &'a Settings,
    pub elapsed_secs: f64,
}

impl fmt::Display for ConversionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str = "═══════════════════════";
        writeln!(f, "{RULE}")?;
        writeln!(f, "   pdf2img conversion report")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "File     : {}", self.file_name.unwrap_or("(unnamed)"))?;
        writeln!(f, "Pages    : {}", self.page_count)?;
        writeln!(f, "Format   : {}", self.settings.format.as_str().to_uppercase())?;
        writeln!(f, "DPI      : {}", self.settings.dpi)?;
        writeln!(f, "Quality  : {}%", self.settings.quality)?;
        writeln!(f, "Color    : {}", self.settings.color_mode)?;
        writeln!(f, "Elapsed  : {:.1} s", self.elapsed_secs)?;
        write!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_is_self_describing() {
        let page = RenderedPage::from_encoded(3, ImageFormat::Png, 10, 20, b"\x89PNG fake");
        assert!(page.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(page.ext, "png");
        assert_eq!(page.file_name(), "page-3.png");
        assert_eq!(page.decode().unwrap(), b"\x89PNG fake");
    }

    #[test]
    fn size_estimate_is_three_quarters_of_url_length() {
        let page = RenderedPage::from_encoded(1, ImageFormat::Jpeg, 1, 1, &[0u8; 300]);
        let expected = (page.data_url.len() as f64 * 0.75).round() as u64;
        assert_eq!(page.size_estimate, expected);
    }

    #[test]
    fn progress_under_reports_last_page() {
        assert_eq!(ProgressEvent::new(0, 3, 1).percent, 0);
        assert_eq!(ProgressEvent::new(1, 3, 2).percent, 33);
        let last = ProgressEvent::new(2, 3, 3);
        assert_eq!(last.percent, 66);
        assert_eq!(last.current_index, 3);
    }

    #[test]
    fn elapsed_rounds_to_one_decimal() {
        let s = CompletionSummary::new(std::time::Duration::from_millis(1_249), 2);
        assert_eq!(s.elapsed_secs, 1.2);
        let s = CompletionSummary::new(std::time::Duration::from_millis(1_250), 2);
        assert_eq!(s.elapsed_secs, 1.3);
    }

    #[test]
    fn report_upper_cases_format() {
        let settings = Settings::default();
        let report = ConversionReport {
            file_name: Some("slides.pdf"),
            page_count: 12,
            settings: &settings,
            elapsed_secs: 3.4,
        }
        .to_string();
        assert!(report.contains("File     : slides.pdf"));
        assert!(report.contains("Format   : JPEG"));
        assert!(report.contains("Quality  : 92%"));
        assert!(report.contains("Elapsed  : 3.4 s"));
    }
}
