// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content extraction — positioned text runs and raw image objects pulled out
// of a paginated source, one page at a time.

pub mod content;
pub mod text;

pub use content::PdfContentExtractor;

use folio_core::error::Result;

/// A piece of text drawn by a single text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub text: String,
    /// Baseline start in user space, points.
    pub x: f64,
    pub y: f64,
    /// Rendered glyph height (font size times vertical scale).
    pub height: f64,
}

impl GlyphRun {
    pub fn new(text: impl Into<String>, x: f64, y: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            height,
        }
    }
}

/// Sample layout of an extracted image, as declared by its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorspaceTag {
    /// One byte per pixel.
    Gray,
    /// Three bytes per pixel.
    Rgb,
    /// Four bytes per pixel (RGB merged with a soft mask).
    Rgba,
    /// Anything this pipeline cannot turn into pixels (CMYK, Indexed,
    /// non-8-bit samples, ...). Carries a description for logging.
    Other(String),
}

/// An image as found in the source, before decoding to RGBA.
#[derive(Debug, Clone)]
pub struct RawImageObject {
    /// Resource name (or `inline` for inline images).
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub colorspace: ColorspaceTag,
    /// Unfiltered sample data.
    pub data: Vec<u8>,
}

impl RawImageObject {
    /// Byte length of `width * height` samples of `channels` bytes each, or
    /// `None` when the declared dimensions do not fit in memory.
    pub fn sample_len(width: u32, height: u32, channels: usize) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(channels)
    }
}

/// Everything extracted from one page, in drawing order.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub runs: Vec<GlyphRun>,
    pub images: Vec<RawImageObject>,
}

/// Source of per-page content for reconstruction.
pub trait ContentExtractor {
    fn page_count(&self) -> usize;

    /// Extract page `index` (0-based). A failure here degrades that page
    /// only; callers carry on with the next page.
    fn extract_page(&self, index: usize) -> Result<PageContent>;
}
