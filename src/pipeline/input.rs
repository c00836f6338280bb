//! Input resolution and validation.
//!
//! A [`PdfSource`] carries raw bytes together with the *declared* content
//! type, the same information a browser hands over for an uploaded `File`.
//! For local files the declared type is derived from the extension; for URLs
//! it is the `Content-Type` response header. [`validate`] is the only
//! validation boundary: there is no content sniffing, so a relabelled non-PDF
//! passes here and fails later inside the render engine.

use crate::error::Pdf2ImgError;
use std::path::Path;
use tracing::{debug, info};

/// The only accepted declared content type.
pub const PDF_MIME: &str = "application/pdf";

/// Declared type for files whose extension is not `.pdf`.
const OCTET_STREAM: &str = "application/octet-stream";

/// Raw input handed to the loader.
#[derive(Clone)]
pub struct PdfSource {
    /// File name shown to the user and used for archive naming.
    pub name: String,
    /// Content type as declared by the origin (extension or HTTP header).
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSource")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl PdfSource {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Convenience constructor declaring `application/pdf`.
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, PDF_MIME, bytes)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check the declared type and size of a source against `max_size`.
///
/// Never touches the render engine.
pub fn validate(source: &PdfSource, max_size: u64) -> Result<(), Pdf2ImgError> {
    check_type(&source.name, &source.declared_type)?;
    check_size(&source.name, source.size(), max_size)
}

fn check_type(name: &str, declared_type: &str) -> Result<(), Pdf2ImgError> {
    if !is_pdf_content_type(declared_type) {
        return Err(Pdf2ImgError::InvalidFormat {
            name: name.to_string(),
            declared_type: if declared_type.is_empty() {
                "untyped".to_string()
            } else {
                declared_type.to_string()
            },
        });
    }
    Ok(())
}

fn check_size(name: &str, size: u64, max_size: u64) -> Result<(), Pdf2ImgError> {
    if size > max_size {
        return Err(Pdf2ImgError::TooLarge {
            name: name.to_string(),
            size,
            limit: max_size,
            limit_mb: max_size / (1024 * 1024),
        });
    }
    Ok(())
}

/// `true` when `content_type` names PDF, ignoring case and parameters.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false)
}

/// Declared type for a local path, from its extension.
pub fn declared_type_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MIME,
        _ => OCTET_STREAM,
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP/HTTPS URL into a [`PdfSource`].
///
/// Inputs with a non-PDF declared type, or larger than `max_size`, are
/// rejected before their body is read whenever that is known up front. The
/// type is checked first.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
    max_size: u64,
) -> Result<PdfSource, Pdf2ImgError> {
    if input.trim().is_empty() {
        return Err(Pdf2ImgError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs, max_size).await
    } else {
        read_local(Path::new(input), max_size).await
    }
}

/// Read a local file, mapping I/O failures to loader errors.
pub async fn read_local(path: &Path, max_size: u64) -> Result<PdfSource, Pdf2ImgError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_to_input_error(e, path))?;

    if !metadata.is_file() {
        return Err(Pdf2ImgError::InvalidInput {
            input: path.display().to_string(),
        });
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let declared_type = declared_type_for_path(path);
    check_type(&name, declared_type)?;
    check_size(&name, metadata.len(), max_size)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_to_input_error(e, path))?;

    debug!("Read local input: {} ({} bytes)", path.display(), bytes.len());
    Ok(PdfSource::new(name, declared_type, bytes))
}

fn io_to_input_error(e: std::io::Error, path: &Path) -> Pdf2ImgError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2ImgError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Pdf2ImgError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Pdf2ImgError::Internal(format!("Failed to read '{}': {e}", path.display())),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64, max_size: u64) -> Result<PdfSource, Pdf2ImgError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2ImgError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Pdf2ImgError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2ImgError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(Pdf2ImgError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = extract_filename(url);
    let declared_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    check_type(&name, &declared_type)?;
    if let Some(len) = response.content_length() {
        check_size(&name, len, max_size)?;
    }

    let bytes = response.bytes().await.map_err(map_send_err)?;

    info!("Downloaded {} bytes ({})", bytes.len(), declared_type);
    Ok(PdfSource::new(name, declared_type, bytes.to_vec()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn content_type_matching_ignores_case_and_params() {
        assert!(is_pdf_content_type("application/pdf"));
        assert!(is_pdf_content_type("Application/PDF; charset=binary"));
        assert!(!is_pdf_content_type("application/octet-stream"));
        assert!(!is_pdf_content_type("image/png"));
        assert!(!is_pdf_content_type(""));
    }

    #[test]
    fn declared_type_comes_from_extension() {
        assert_eq!(declared_type_for_path(Path::new("a/Report.PDF")), PDF_MIME);
        assert_eq!(declared_type_for_path(Path::new("scan.png")), OCTET_STREAM);
        assert_eq!(declared_type_for_path(Path::new("noext")), OCTET_STREAM);
    }

    #[test]
    fn validate_rejects_wrong_type_before_size() {
        let src = PdfSource::new("photo.png", "image/png", vec![0; 10]);
        assert!(matches!(
            validate(&src, 5),
            Err(Pdf2ImgError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn validate_rejects_oversized_input() {
        let src = PdfSource::pdf("big.pdf", vec![0; 11]);
        assert!(matches!(
            validate(&src, 10),
            Err(Pdf2ImgError::TooLarge { size: 11, limit: 10, .. })
        ));
        let exact = PdfSource::pdf("ok.pdf", vec![0; 10]);
        assert!(validate(&exact, 10).is_ok());
    }

    #[test]
    fn extract_filename_from_url_path() {
        assert_eq!(extract_filename("https://x.org/papers/attn.pdf"), "attn.pdf");
        assert_eq!(extract_filename("https://x.org/pdf/1706"), "downloaded.pdf");
    }

    #[test]
    fn read_local_missing_file() {
        let result = tokio_test::block_on(read_local(Path::new("/definitely/not/here.pdf"), 1024));
        assert!(matches!(result, Err(Pdf2ImgError::FileNotFound { .. })));
    }

    #[test]
    fn read_local_checks_size_before_reading() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(&[b'%'; 64]).unwrap();
        let result = tokio_test::block_on(read_local(tmp.path(), 16));
        assert!(matches!(result, Err(Pdf2ImgError::TooLarge { size: 64, .. })));

        let ok = tokio_test::block_on(read_local(tmp.path(), 1024)).unwrap();
        assert_eq!(ok.declared_type, PDF_MIME);
        assert_eq!(ok.bytes.len(), 64);
    }

    #[test]
    fn read_local_checks_type_before_size() {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(&[0u8; 64]).unwrap();
        let result = tokio_test::block_on(read_local(tmp.path(), 16));
        assert!(matches!(
            result,
            Err(Pdf2ImgError::InvalidFormat { ref declared_type, .. }) if declared_type == OCTET_STREAM
        ));

        let roomy = tokio_test::block_on(read_local(tmp.path(), 1024));
        assert!(matches!(roomy, Err(Pdf2ImgError::InvalidFormat { .. })));
    }
}
