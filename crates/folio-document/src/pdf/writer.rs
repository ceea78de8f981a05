// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — create new pages from raster images or paragraph text using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use folio_core::config::ConversionConfig;
use folio_core::error::Result;
use folio_core::types::{ImageLayout, PaperSize};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{compute_anchored_rect, compute_fitted_scale};
use crate::image::RasterImage;

/// Body text size for paragraph layout.
const FONT_SIZE_PT: f32 = 11.0;
/// Baseline-to-baseline distance.
const LINE_HEIGHT_PT: f32 = 14.0;
/// Margin around paragraph text (20 mm).
const TEXT_MARGIN_MM: f32 = 20.0;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_CHAR_WIDTH_EM: f32 = 0.5;

/// Creates new PDF documents from raster images or text.
pub struct PdfWriter {
    paper_size: PaperSize,
    /// Margin used when fitting images, in points.
    margin_pt: f64,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize, margin_pt: f64, title: impl Into<String>) -> Self {
        Self {
            paper_size,
            margin_pt,
            title: title.into(),
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.paper_size, config.margin_pt, config.title.clone())
    }

    fn page_dimensions_mm(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    // -- Image page -----------------------------------------------------------

    /// Create a single-page PDF with `image` fitted inside the margins,
    /// scaled by the layout's user scale and placed at its anchor.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn create_image_page(&self, image: &RasterImage, layout: &ImageLayout) -> Result<Vec<u8>> {
        layout.validate()?;
        let (page_w, page_h) = self.paper_size.dimensions_pt();
        let natural_w = image.width() as f64;
        let natural_h = image.height() as f64;

        let size = compute_fitted_scale(
            page_w,
            page_h,
            self.margin_pt,
            natural_w,
            natural_h,
            layout.scale,
        )?;
        let origin = compute_anchored_rect(
            page_w,
            page_h,
            self.margin_pt,
            size.width,
            size.height,
            layout.anchor,
        );

        // printpdf splits RGBA samples into a soft mask.
        let (pixels, data_format) = if image.has_transparency() {
            (image.to_rgba_bytes(), RawImageFormat::RGBA8)
        } else {
            (image.to_rgb_bytes(), RawImageFormat::RGB8)
        };
        let raw = RawImage {
            pixels: RawImageData::U8(pixels),
            width: image.width() as usize,
            height: image.height() as usize,
            data_format,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(&self.title);
        let xobject_id = doc.add_image(&raw);

        // At 72 dpi one pixel is one point, so the scale is points per pixel.
        let scale = (size.width / natural_w) as f32;
        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(origin.x as f32)),
                translate_y: Some(Pt(origin.y as f32)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(72.0),
                rotate: None,
            },
        }];

        let (w_mm, h_mm) = self.page_dimensions_mm();
        doc.with_pages(vec![PdfPage::new(w_mm, h_mm, ops)]);

        debug!(
            x = origin.x,
            y = origin.y,
            rendered_w = size.width,
            rendered_h = size.height,
            anchor = %layout.anchor,
            "Image placed on page"
        );

        Ok(save(&doc))
    }

    // -- Paragraph text -------------------------------------------------------

    /// Lay out paragraphs top to bottom with the built-in Helvetica font,
    /// wrapping long lines and breaking pages as needed. An empty paragraph
    /// list produces a single blank page.
    #[instrument(skip_all, fields(paragraphs = paragraphs.len()))]
    pub fn create_from_paragraphs(&self, paragraphs: &[String]) -> Result<Vec<u8>> {
        let (page_w, page_h) = self.page_dimensions_mm();
        let margin_pt = Mm(TEXT_MARGIN_MM).into_pt().0;
        let page_w_pt = page_w.into_pt().0;
        let page_h_pt = page_h.into_pt().0;

        let avg_char_pt = AVG_CHAR_WIDTH_EM * FONT_SIZE_PT;
        let max_chars = (((page_w_pt - 2.0 * margin_pt) / avg_char_pt) as usize).max(1);
        let lines_per_page = (((page_h_pt - 2.0 * margin_pt) / LINE_HEIGHT_PT) as usize).max(1);

        let lines: Vec<String> = paragraphs
            .iter()
            .flat_map(|paragraph| wrap_text(paragraph, max_chars))
            .collect();

        let mut pages: Vec<PdfPage> = lines
            .chunks(lines_per_page)
            .map(|chunk| {
                let ops = chunk
                    .iter()
                    .enumerate()
                    .flat_map(|(index, line)| {
                        let y_pt = page_h_pt - margin_pt - FONT_SIZE_PT - index as f32 * LINE_HEIGHT_PT;
                        text_ops(line, margin_pt, y_pt)
                    })
                    .collect();
                PdfPage::new(page_w, page_h, ops)
            })
            .collect();

        if pages.is_empty() {
            pages.push(PdfPage::new(page_w, page_h, Vec::new()));
        }

        info!(
            lines = lines.len(),
            pages = pages.len(),
            paper = ?self.paper_size,
            "Paragraph layout complete"
        );

        let mut doc = PdfDocument::new(&self.title);
        doc.with_pages(pages);
        Ok(save(&doc))
    }
}

fn text_ops(line: &str, x_pt: f32, y_pt: f32) -> Vec<Op> {
    if line.is_empty() {
        return Vec::new();
    }
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point {
                x: Pt(x_pt),
                y: Pt(y_pt),
            },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(FONT_SIZE_PT),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.to_string())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

fn save(doc: &PdfDocument) -> Vec<u8> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "printpdf reported warnings while saving");
    }
    output
}

// -- Text wrapping helper -----------------------------------------------------

/// Wrap text so that no line exceeds `max_width` characters.
///
/// Existing newlines are kept as line breaks; words longer than `max_width`
/// are force-broken on character boundaries.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len <= max_width {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
                continue;
            }
            if current_len > 0 {
                result.push(std::mem::take(&mut current));
                current_len = 0;
            }

            let chars: Vec<char> = word.chars().collect();
            let mut chunks = chars.chunks(max_width).peekable();
            while let Some(chunk) = chunks.next() {
                if chunks.peek().is_some() {
                    result.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
            }
        }

        result.push(current);
    }

    result
}
