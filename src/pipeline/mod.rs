//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the render backend can be swapped without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ color ──▶ encode
//! (path/URL) (engine)  (pixels)  (data URI)
//! ```
//!
//! 1. [`input`]: resolve a path or URL and check declared type and size
//! 2. [`render`]: rasterise one page through a [`render::RenderEngine`]
//! 3. [`color`]: optional grayscale or sepia transform, in place
//! 4. [`encode`]: JPEG/PNG/WebP encode and wrap as a base64 data URI

pub mod color;
pub mod encode;
pub mod input;
pub mod render;
