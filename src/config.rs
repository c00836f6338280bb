//! Configuration types for PDF-to-image conversion.
//!
//! Two layers of configuration exist:
//!
//! * [`Settings`]: the user-facing output configuration (format, DPI,
//!   quality, background fill, colour mode, page range). It is mutated through
//!   partial [`SettingsPatch`]es and read as a snapshot at the start of every
//!   run, so changing it mid-run never affects the pages already in flight.
//! * [`SessionConfig`]: fixed for the lifetime of a
//!   [`crate::session::ConversionSession`] (file size ceiling, settings
//!   strictness). Built via [`SessionConfig::builder()`].

use crate::error::Pdf2ImgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nominal DPI bounds. Values outside are accepted in lenient mode.
pub const DPI_MIN: u32 = 72;
pub const DPI_MAX: u32 = 300;

/// Nominal quality bounds (percent).
pub const QUALITY_MIN: u8 = 60;
pub const QUALITY_MAX: u8 = 100;

/// Default input size ceiling: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// PDF user space is 72 points per inch; rendering at 72 DPI is scale 1.0.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Named DPI presets offered by the CLI.
pub const DPI_PRESETS: &[(&str, u32)] = &[
    ("web", 72),
    ("screen", 96),
    ("standard", 144),
    ("print", 200),
    ("high-res", 300),
];

// ── Settings ─────────────────────────────────────────────────────────────

/// Output configuration for a conversion run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ImageFormat, Settings};
///
/// let settings = Settings { dpi: 144, format: ImageFormat::Png, ..Settings::default() };
/// assert_eq!(settings.scale(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Output codec. Default: JPEG.
    pub format: ImageFormat,

    /// Rendering DPI. Nominal range 72–300, default 144 (scale 2.0).
    pub dpi: u32,

    /// Codec quality in percent. Nominal range 60–100, default 92.
    /// Ignored by lossless formats (PNG, WebP).
    pub quality: u8,

    /// Fill used under transparent page regions. Default: white.
    pub background: Background,

    /// Post-render pixel transform. Default: colour (no transform).
    pub color_mode: ColorMode,

    /// First page to convert (1-indexed, inclusive). Default: 1.
    pub page_from: usize,

    /// Last page to convert (1-indexed, inclusive). `None` means the last page.
    pub page_to: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: ImageFormat::default(),
            dpi: 144,
            quality: 92,
            background: Background::default(),
            color_mode: ColorMode::default(),
            page_from: 1,
            page_to: None,
        }
    }
}

impl Settings {
    /// Render scale factor: `dpi / 72`.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / POINTS_PER_INCH
    }

    /// Return a copy with `patch` merged in (last write wins per field).
    pub fn merged(&self, patch: &SettingsPatch) -> Settings {
        let mut next = self.clone();
        if let Some(format) = patch.format {
            next.format = format;
        }
        if let Some(dpi) = patch.dpi {
            next.dpi = dpi;
        }
        if let Some(quality) = patch.quality {
            next.quality = quality;
        }
        if let Some(background) = patch.background {
            next.background = background;
        }
        if let Some(color_mode) = patch.color_mode {
            next.color_mode = color_mode;
        }
        if let Some(page_from) = patch.page_from {
            next.page_from = page_from;
        }
        if let Some(page_to) = patch.page_to {
            next.page_to = page_to;
        }
        next
    }

    /// Check DPI and quality against their nominal bounds.
    pub fn validate(&self) -> Result<(), Pdf2ImgError> {
        if !(DPI_MIN..=DPI_MAX).contains(&self.dpi) {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "DPI must be {DPI_MIN}–{DPI_MAX}, got {}",
                self.dpi
            )));
        }
        if !(QUALITY_MIN..=QUALITY_MAX).contains(&self.quality) {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "Quality must be {QUALITY_MIN}–{QUALITY_MAX}, got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// Clamp the configured page range against `page_count`.
    ///
    /// Returns the inclusive `(from, to)` pair, or
    /// [`Pdf2ImgError::InvalidRange`] when the clamped range is empty.
    pub fn page_range(&self, page_count: usize) -> Result<(usize, usize), Pdf2ImgError> {
        let from = self.page_from.max(1);
        let to = page_count.min(self.page_to.unwrap_or(page_count));
        if from > to {
            return Err(Pdf2ImgError::InvalidRange {
                from,
                to,
                total: page_count,
            });
        }
        Ok((from, to))
    }
}

/// A partial update to [`Settings`]. `None` fields are left unchanged.
///
/// `page_to` is doubly optional so a patch can clear the upper bound:
/// `Some(None)` resets it to "last page".
///
/// Deserialises from the same camelCase keys as [`Settings`]:
/// ```rust
/// use edgequake_pdf2img::SettingsPatch;
///
/// let patch: SettingsPatch = serde_json::from_str(r#"{"dpi": 200, "colorMode": "sepia"}"#).unwrap();
/// assert_eq!(patch.dpi, Some(200));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub format: Option<ImageFormat>,
    pub dpi: Option<u32>,
    pub quality: Option<u8>,
    pub background: Option<Background>,
    pub color_mode: Option<ColorMode>,
    pub page_from: Option<usize>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub page_to: Option<Option<usize>>,
}

impl SettingsPatch {
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    pub fn color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = Some(mode);
        self
    }

    pub fn page_from(mut self, page: usize) -> Self {
        self.page_from = Some(page);
        self
    }

    pub fn page_to(mut self, page: Option<usize>) -> Self {
        self.page_to = Some(page);
        self
    }

    /// Merge `other` on top of `self`; fields set in `other` win.
    pub fn then(mut self, other: SettingsPatch) -> Self {
        self.format = other.format.or(self.format);
        self.dpi = other.dpi.or(self.dpi);
        self.quality = other.quality.or(self.quality);
        self.background = other.background.or(self.background);
        self.color_mode = other.color_mode.or(self.color_mode);
        self.page_from = other.page_from.or(self.page_from);
        self.page_to = other.page_to.or(self.page_to);
        self
    }
}

/// Distinguishes a missing `pageTo` key (leave unchanged) from an explicit
/// `null` (clear the bound).
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Option<usize>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<usize>>, D::Error> {
        Option::<usize>::deserialize(deserializer).map(Some)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output image codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossy, no alpha channel. (default)
    #[default]
    Jpeg,
    /// Lossless with alpha.
    Png,
    /// Lossless WebP with alpha.
    Webp,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }

    /// Whether the codec honours [`Settings::quality`].
    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = Pdf2ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(Pdf2ImgError::InvalidConfig(format!(
                "Unknown image format '{other}' (expected jpeg, png or webp)"
            ))),
        }
    }
}

/// Fill applied to the bitmap before the page is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Opaque white. Needed for JPEG, which has no alpha channel. (default)
    #[default]
    White,
    /// Fully transparent; only meaningful for PNG and WebP.
    Transparent,
}

impl Background {
    /// RGBA clear colour handed to the render engine.
    pub fn clear_color(self) -> [u8; 4] {
        match self {
            Background::White => [255, 255, 255, 255],
            Background::Transparent => [0, 0, 0, 0],
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Background::White => "white",
            Background::Transparent => "transparent",
        })
    }
}

/// Post-render pixel transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Leave pixels untouched. (default)
    #[default]
    Color,
    /// Luma-weighted grey.
    Grayscale,
    /// Classic sepia tone.
    Sepia,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorMode::Color => "color",
            ColorMode::Grayscale => "grayscale",
            ColorMode::Sepia => "sepia",
        })
    }
}

/// How [`crate::session::ConversionSession::set_settings`] treats
/// out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strictness {
    /// Accept anything; out-of-range DPI or quality only affects fidelity. (default)
    #[default]
    Lenient,
    /// Reject DPI outside 72–300 and quality outside 60–100.
    Strict,
}

// ── Session configuration ────────────────────────────────────────────────

/// Fixed configuration for a [`crate::session::ConversionSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum accepted input size in bytes. Default: 50 MiB.
    pub max_file_size: u64,

    /// Validation applied to settings patches. Default: lenient.
    pub strictness: Strictness,

    /// Settings the session starts with.
    pub initial_settings: Settings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            strictness: Strictness::default(),
            initial_settings: Settings::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new builder for `SessionConfig`.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.max_file_size = mb.saturating_mul(1024 * 1024);
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.config.strictness = strictness;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.config.initial_settings = settings;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SessionConfig, Pdf2ImgError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(Pdf2ImgError::InvalidConfig(
                "Maximum file size must be > 0".into(),
            ));
        }
        if c.strictness == Strictness::Strict {
            c.initial_settings.validate()?;
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_follows_dpi() {
        let s = Settings {
            dpi: 144,
            ..Settings::default()
        };
        assert_eq!(s.scale(), 2.0);
        let s = Settings {
            dpi: 72,
            ..Settings::default()
        };
        assert_eq!(s.scale(), 1.0);
    }

    #[test]
    fn only_jpeg_honours_quality() {
        assert!(ImageFormat::Jpeg.is_lossy());
        assert!(!ImageFormat::Png.is_lossy());
        assert!(!ImageFormat::Webp.is_lossy());
    }

    #[test]
    fn merge_is_shallow_last_write_wins() {
        let base = Settings::default();
        let merged = base
            .merged(&SettingsPatch::default().dpi(200).format(ImageFormat::Png))
            .merged(&SettingsPatch::default().dpi(96));
        assert_eq!(merged.dpi, 96);
        assert_eq!(merged.format, ImageFormat::Png);
        assert_eq!(merged.quality, base.quality);
    }

    #[test]
    fn merge_accepts_out_of_range_values() {
        let merged = Settings::default().merged(&SettingsPatch::default().dpi(1000).quality(5));
        assert_eq!(merged.dpi, 1000);
        assert_eq!(merged.quality, 5);
        assert!(merged.validate().is_err());
    }

    #[test]
    fn page_to_can_be_cleared() {
        let bounded = Settings::default().merged(&SettingsPatch::default().page_to(Some(3)));
        assert_eq!(bounded.page_to, Some(3));
        let cleared = bounded.merged(&SettingsPatch::default().page_to(None));
        assert_eq!(cleared.page_to, None);
        let untouched = bounded.merged(&SettingsPatch::default());
        assert_eq!(untouched.page_to, Some(3));
    }

    #[test]
    fn page_range_clamps_to_document() {
        let s = Settings {
            page_from: 0,
            page_to: Some(99),
            ..Settings::default()
        };
        assert_eq!(s.page_range(4).unwrap(), (1, 4));

        let s = Settings {
            page_from: 2,
            page_to: None,
            ..Settings::default()
        };
        assert_eq!(s.page_range(3).unwrap(), (2, 3));
    }

    #[test]
    fn page_range_rejects_inverted_range() {
        let s = Settings {
            page_from: 5,
            page_to: Some(2),
            ..Settings::default()
        };
        assert!(matches!(
            s.page_range(10),
            Err(Pdf2ImgError::InvalidRange { from: 5, to: 2, total: 10 })
        ));

        // from beyond the last page is also empty after clamping
        let s = Settings {
            page_from: 8,
            ..Settings::default()
        };
        assert!(s.page_range(3).is_err());
    }

    #[test]
    fn patch_json_distinguishes_null_from_missing() {
        let missing: SettingsPatch = serde_json::from_str(r#"{"dpi": 96}"#).unwrap();
        assert_eq!(missing.page_to, None);

        let cleared: SettingsPatch = serde_json::from_str(r#"{"pageTo": null}"#).unwrap();
        assert_eq!(cleared.page_to, Some(None));

        let set: SettingsPatch =
            serde_json::from_str(r#"{"pageTo": 7, "format": "webp", "background": "transparent"}"#)
                .unwrap();
        assert_eq!(set.page_to, Some(Some(7)));
        assert_eq!(set.format, Some(ImageFormat::Webp));
        assert_eq!(set.background, Some(Background::Transparent));
    }

    #[test]
    fn patch_then_prefers_later_fields() {
        let file = SettingsPatch::default().dpi(200).quality(80);
        let flags = SettingsPatch::default().dpi(300);
        let combined = file.then(flags);
        assert_eq!(combined.dpi, Some(300));
        assert_eq!(combined.quality, Some(80));
    }

    #[test]
    fn format_table() {
        assert_eq!(ImageFormat::Jpeg.mime(), "image/jpeg");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Webp.extension(), "webp");
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("tiff".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn strict_builder_rejects_bad_initial_settings() {
        let bad = Settings {
            dpi: 20,
            ..Settings::default()
        };
        assert!(SessionConfig::builder()
            .strictness(Strictness::Strict)
            .settings(bad.clone())
            .build()
            .is_err());
        assert!(SessionConfig::builder().settings(bad).build().is_ok());
        assert!(SessionConfig::builder().max_file_size(0).build().is_err());
    }
}
