//! Per-pixel colour transforms applied after rendering.
//!
//! Both transforms work in place on RGBA bitmaps and never touch alpha.
//! Results are rounded to the nearest integer and clamped to `0..=255`.

use crate::config::ColorMode;
use image::RgbaImage;

/// Apply `mode` to every pixel of `image`.
pub fn apply_color_mode(image: &mut RgbaImage, mode: ColorMode) {
    let transform: fn(&mut [u8; 4]) = match mode {
        ColorMode::Color => return,
        ColorMode::Grayscale => grayscale_pixel,
        ColorMode::Sepia => sepia_pixel,
    };
    for pixel in image.pixels_mut() {
        transform(&mut pixel.0);
    }
}

/// Rec. 601 luma: `0.299 R + 0.587 G + 0.114 B`, written to all three channels.
pub fn grayscale_pixel(px: &mut [u8; 4]) {
    let [r, g, b, _] = channels(px);
    let gray = to_channel(0.299 * r + 0.587 * g + 0.114 * b);
    px[0] = gray;
    px[1] = gray;
    px[2] = gray;
}

/// Classic sepia matrix, each output channel capped at 255.
pub fn sepia_pixel(px: &mut [u8; 4]) {
    let [r, g, b, _] = channels(px);
    px[0] = to_channel(0.393 * r + 0.769 * g + 0.189 * b);
    px[1] = to_channel(0.349 * r + 0.686 * g + 0.168 * b);
    px[2] = to_channel(0.272 * r + 0.534 * g + 0.131 * b);
}

fn channels(px: &[u8; 4]) -> [f64; 4] {
    px.map(f64::from)
}

fn to_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn grayscale_weights() {
        let mut px = [255, 0, 0, 200];
        grayscale_pixel(&mut px);
        assert_eq!(px, [76, 76, 76, 200]);

        let mut px = [0, 255, 0, 255];
        grayscale_pixel(&mut px);
        assert_eq!(px, [150, 150, 150, 255]);

        let mut px = [0, 0, 255, 0];
        grayscale_pixel(&mut px);
        assert_eq!(px, [29, 29, 29, 0]);
    }

    #[test]
    fn grayscale_is_idempotent() {
        for v in 0..=255u8 {
            let mut px = [v, v, v, 255];
            grayscale_pixel(&mut px);
            assert_eq!(px, [v, v, v, 255], "grey {v} drifted");
        }
        for &(r, g, b) in &[(12, 200, 99), (255, 128, 0), (3, 7, 250)] {
            let mut once = [r, g, b, 9];
            grayscale_pixel(&mut once);
            let mut twice = once;
            grayscale_pixel(&mut twice);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn sepia_saturates_at_white() {
        let mut px = [255, 255, 255, 128];
        sepia_pixel(&mut px);
        // Blue row sums to 0.937, so it stays below the cap.
        assert_eq!(px, [255, 255, 239, 128]);

        let mut px = [0, 0, 0, 17];
        sepia_pixel(&mut px);
        assert_eq!(px, [0, 0, 0, 17]);
    }

    #[test]
    fn sepia_mid_tone() {
        let mut px = [100, 150, 210, 255];
        sepia_pixel(&mut px);
        // 194.34, 173.08, 134.81
        assert_eq!(px, [194, 173, 135, 255]);
    }

    #[test]
    fn color_mode_leaves_pixels_alone() {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 40]));
        apply_color_mode(&mut img, ColorMode::Color);
        assert!(img.pixels().all(|p| p.0 == [10, 20, 30, 40]));
    }

    #[test]
    fn apply_covers_every_pixel_and_keeps_alpha() {
        let mut img = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 90, (x + y) as u8]));
        apply_color_mode(&mut img, ColorMode::Grayscale);
        for (x, y, p) in img.enumerate_pixels() {
            assert_eq!(p.0[0], p.0[1]);
            assert_eq!(p.0[1], p.0[2]);
            assert_eq!(p.0[3], (x + y) as u8);
        }
    }
}
