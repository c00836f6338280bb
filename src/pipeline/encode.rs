//! Image encoding: rendered bitmap → codec bytes → [`RenderedPage`].
//!
//! JPEG has no alpha channel, so RGBA input is flattened to RGB before
//! encoding (pages rendered on a transparent background come out black where
//! nothing was drawn; pick [`crate::Background::White`] for JPEG). PNG and
//! WebP keep alpha. WebP is encoded losslessly, so `quality` only affects
//! JPEG.

use crate::config::{ImageFormat, Settings};
use crate::error::Pdf2ImgError;
use crate::output::RenderedPage;
use crate::pipeline::color::apply_color_mode;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::debug;

/// Encode `image` with the given codec.
///
/// `quality` is a percentage; values outside `1..=100` are clamped, since
/// lenient settings may carry anything.
pub fn encode_image(image: RgbaImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let (width, height) = image.dimensions();
    let mut buf = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).into_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        ImageFormat::Png => {
            PngEncoder::new(&mut buf).write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)?;
        }
        ImageFormat::Webp => {
            WebPEncoder::new_lossless(&mut buf).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
    }

    Ok(buf)
}

/// Colour-transform, encode and package one rendered page.
///
/// CPU-bound; the driver calls it from `spawn_blocking`.
pub fn finish_page(page_num: usize, mut bitmap: RgbaImage, settings: &Settings) -> Result<RenderedPage, Pdf2ImgError> {
    apply_color_mode(&mut bitmap, settings.color_mode);
    let (width, height) = bitmap.dimensions();

    let bytes = encode_image(bitmap, settings.format, settings.quality).map_err(|e| Pdf2ImgError::EncodeFailed {
        page: page_num,
        detail: e.to_string(),
    })?;

    let page = RenderedPage::from_encoded(page_num, settings.format, width, height, &bytes);
    debug!(
        "Encoded page {} as {} → {} bytes",
        page_num,
        settings.format,
        bytes.len()
    );
    Ok(page)
}
