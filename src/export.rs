//! Writing converted pages to disk, one file per page or as a ZIP archive.
//!
//! Every file is written atomically: bytes go to a `.tmp` sibling first and
//! are renamed into place, so an interrupted export never leaves a truncated
//! image or archive behind.

use crate::error::Pdf2ImgError;
use crate::output::RenderedPage;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Suffix appended to the document stem for archive names.
const ARCHIVE_SUFFIX: &str = "-images.zip";

/// Stem used when the document has no usable name.
const FALLBACK_STEM: &str = "converted";

/// Archive file name for a document: `report.pdf` → `report-images.zip`.
pub fn archive_name(document_name: &str) -> String {
    let trimmed = document_name.trim();
    let stem = match trimmed.len().checked_sub(4) {
        Some(cut) if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".pdf") => &trimmed[..cut],
        _ => trimmed,
    };
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
    format!("{stem}{ARCHIVE_SUFFIX}")
}

/// Write each page as `<dir>/page-<N>.<ext>`, creating `dir` if needed.
///
/// Returns the written paths in page order.
pub async fn write_images(pages: &[RenderedPage], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, Pdf2ImgError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Pdf2ImgError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let path = dir.join(page.file_name());
        write_atomic(&path, &page.decode()?).await?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    info!("Wrote {} images to {}", written.len(), dir.display());
    Ok(written)
}

/// Bundle pages into an in-memory ZIP archive with DEFLATE compression.
pub fn build_zip(pages: &[RenderedPage]) -> Result<Vec<u8>, Pdf2ImgError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for page in pages {
        let bytes = page.decode()?;
        zip.start_file(page.file_name(), options)
            .map_err(|e| Pdf2ImgError::ArchiveFailed(format!("{}: {e}", page.file_name())))?;
        zip.write_all(&bytes)
            .map_err(|e| Pdf2ImgError::ArchiveFailed(format!("{}: {e}", page.file_name())))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| Pdf2ImgError::ArchiveFailed(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Build the archive and write it to `path`.
pub async fn write_zip(pages: &[RenderedPage], path: impl AsRef<Path>) -> Result<u64, Pdf2ImgError> {
    let path = path.as_ref();
    let archive = build_zip(pages)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Pdf2ImgError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    write_atomic(path, &archive).await?;
    info!(
        "Wrote {} ({} pages, {} bytes)",
        path.display(),
        pages.len(),
        archive.len()
    );
    Ok(archive.len() as u64)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2ImgError> {
    let write_err = |e: std::io::Error| Pdf2ImgError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageFormat;
    use zip::ZipArchive;

    fn pages() -> Vec<RenderedPage> {
        vec![
            RenderedPage::from_encoded(2, ImageFormat::Png, 1, 1, b"second"),
            RenderedPage::from_encoded(3, ImageFormat::Png, 1, 1, b"third page"),
        ]
    }

    #[test]
    fn archive_name_strips_pdf_extension() {
        assert_eq!(archive_name("report.pdf"), "report-images.zip");
        assert_eq!(archive_name("Slides.PDF"), "Slides-images.zip");
        assert_eq!(archive_name("notes.txt"), "notes.txt-images.zip");
        assert_eq!(archive_name(".pdf"), "converted-images.zip");
        assert_eq!(archive_name(""), "converted-images.zip");
    }

    #[test]
    fn zip_contains_one_entry_per_page() {
        let archive = build_zip(&pages()).unwrap();
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut entry = zip.by_name("page-3.png").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut body = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut body).unwrap();
        assert_eq!(body, b"third page");
    }

    #[tokio::test]
    async fn write_images_creates_directory_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/out");
        let written = write_images(&pages(), &out).await.unwrap();

        assert_eq!(written, vec![out.join("page-2.png"), out.join("page-3.png")]);
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"second");
        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn write_zip_reports_archive_size() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(archive_name("deck.pdf"));
        let size = write_zip(&pages(), &path).await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), size);
    }
}
