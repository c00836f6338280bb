//! End-to-end tests against the real pdfium engine.
//!
//! These need a pdfium shared library, so they are gated behind the
//! `E2E_ENABLED` environment variable and skip themselves otherwise.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=./libpdfium.so cargo test --test e2e -- --nocapture

use edgequake_pdf2img::export::{archive_name, build_zip, write_images};
use edgequake_pdf2img::{
    ColorMode, ConversionSession, ImageFormat, NoopProgressCallback, PdfSource, PdfiumEngine, Pdf2ImgError,
    RunOutcome, SessionConfig, SettingsPatch,
};
use std::sync::Arc;

/// Skip this test unless E2E_ENABLED is set and pdfium can be bound.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let engine = PdfiumEngine::new();
        if let Err(e) = engine.probe() {
            println!("SKIP: {e}");
            return;
        }
        engine
    }};
}

/// A two-page US-letter PDF with one filled rectangle per page.
///
/// Cross-reference offsets are computed so pdfium does not need to repair
/// the file.
fn two_page_pdf() -> Vec<u8> {
    let content = b"0 0 1 rg 72 72 200 100 re f";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            String::from_utf8_lossy(content)
        ),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

#[tokio::test]
async fn converts_pages_at_requested_dpi() {
    let engine = e2e_skip_unless_ready!();
    let session = ConversionSession::new(Arc::new(engine), SessionConfig::default());

    let info = session
        .load(PdfSource::pdf("letter.pdf", two_page_pdf()))
        .await
        .unwrap();
    assert_eq!(info.page_count, 2);

    session
        .set_settings(&SettingsPatch::default().dpi(72).format(ImageFormat::Png))
        .unwrap();
    let outcome = session.convert(&NoopProgressCallback).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(s) if s.total_pages == 2));

    let images = session.images();
    assert_eq!(images.len(), 2);
    // 612x792 pt at 72 DPI is 612x792 px.
    assert_eq!((images[0].width, images[0].height), (612, 792));

    let zip = build_zip(&images).unwrap();
    assert!(!zip.is_empty());
    assert_eq!(archive_name(&info.name), "letter-images.zip");
}

#[tokio::test]
async fn grayscale_jpeg_written_to_disk() {
    let engine = e2e_skip_unless_ready!();
    let session = ConversionSession::new(Arc::new(engine), SessionConfig::default());
    session
        .load(PdfSource::pdf("letter.pdf", two_page_pdf()))
        .await
        .unwrap();
    session
        .set_settings(
            &SettingsPatch::default()
                .color_mode(ColorMode::Grayscale)
                .page_from(2),
        )
        .unwrap();
    session.convert(&NoopProgressCallback).await.unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let written = write_images(&session.images(), tmp.path()).await.unwrap();
    assert_eq!(written, vec![tmp.path().join("page-2.jpg")]);

    let img = image::open(&written[0]).unwrap().into_rgb8();
    // 144 DPI → scale 2.0
    assert_eq!(img.dimensions(), (1224, 1584));
    let [r, g, b] = img.get_pixel(300, 1584 - 300).0;
    assert!(r.abs_diff(g) <= 2 && g.abs_diff(b) <= 2, "not grey: {r},{g},{b}");
}

#[tokio::test]
async fn garbage_bytes_fail_to_open() {
    let engine = e2e_skip_unless_ready!();
    let session = ConversionSession::new(Arc::new(engine), SessionConfig::default());

    let err = session
        .load(PdfSource::pdf("broken.pdf", b"definitely not a pdf".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2ImgError::RenderFailure { page: None, .. }));
    assert!(err.to_string().starts_with("Failed to open PDF"));
}
