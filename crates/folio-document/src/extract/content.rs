// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content stream walker — interprets the text and image operators of each
// page using `lopdf`'s content decoder.

use folio_core::error::{FolioError, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument, warn};

use super::text::{Matrix, TextState, decode_pdf_string};
use super::{ColorspaceTag, ContentExtractor, PageContent, RawImageObject};
use crate::image::RasterImage;
use crate::pdf::objects::{as_number, name_of, number_at, resolve, resolve_dict, resolve_inherited};

/// Form XObjects nested deeper than this are skipped.
const MAX_FORM_DEPTH: usize = 8;

/// `TJ` adjustments more negative than this read as a word gap.
const WORD_GAP_THOUSANDTHS: f64 = -200.0;

/// Extracts page content from a PDF held in memory.
pub struct PdfContentExtractor {
    document: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfContentExtractor {
    /// Parse `data`. A document that cannot be parsed at all is a
    /// `SourceParse` error; per-page problems surface later from
    /// [`ContentExtractor::extract_page`].
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| FolioError::SourceParse(format!("failed to load PDF: {err}")))?;
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "Extractor ready");
        Ok(Self { document, page_ids })
    }
}

impl ContentExtractor for PdfContentExtractor {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn extract_page(&self, index: usize) -> Result<PageContent> {
        let page_number = index + 1;
        let page_id = *self.page_ids.get(index).ok_or_else(|| FolioError::Extraction {
            page: page_number,
            detail: "page does not exist".into(),
        })?;

        let bytes = self
            .document
            .get_page_content(page_id)
            .map_err(|err| FolioError::Extraction {
                page: page_number,
                detail: format!("cannot read content stream: {err}"),
            })?;
        let resources = resolve_inherited(&self.document, page_id, b"Resources")
            .and_then(|object| resolve_dict(&self.document, object));

        let mut walker = Walker::new(&self.document, page_number);
        walker.walk(&bytes, resources, Matrix::IDENTITY, 0)?;
        debug!(
            page = page_number,
            runs = walker.content.runs.len(),
            images = walker.content.images.len(),
            "Page extracted"
        );
        Ok(walker.content)
    }
}

/// Interprets one page's operators, accumulating runs and images.
struct Walker<'a> {
    document: &'a Document,
    page: usize,
    content: PageContent,
}

impl<'a> Walker<'a> {
    fn new(document: &'a Document, page: usize) -> Self {
        Self {
            document,
            page,
            content: PageContent::default(),
        }
    }

    fn walk(
        &mut self,
        bytes: &[u8],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(bytes).map_err(|err| FolioError::Extraction {
            page: self.page,
            detail: format!("cannot decode content stream: {err}"),
        })?;

        let mut ctm = base_ctm;
        let mut saved: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => ctm = saved.pop().unwrap_or(base_ctm),
                "cm" => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        ctm = matrix.multiply(&ctm);
                    }
                }
                "BT" => text.begin(),
                "ET" => {}
                "Tf" => {
                    if let Some(size) = number_at(operands, 1) {
                        text.set_font_size(size);
                    }
                }
                "Tm" => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        text.set_matrix(matrix);
                    }
                }
                "Td" | "TD" => {
                    if let (Some(tx), Some(ty)) = (number_at(operands, 0), number_at(operands, 1)) {
                        if op.operator == "TD" {
                            text.set_leading(-ty);
                        }
                        text.move_line(tx, ty);
                    }
                }
                "T*" => text.next_line(),
                "TL" => {
                    if let Some(leading) = number_at(operands, 0) {
                        text.set_leading(leading);
                    }
                }
                "Tz" => {
                    if let Some(percent) = number_at(operands, 0) {
                        text.set_horizontal_scale(percent);
                    }
                }
                "Ts" => {
                    if let Some(rise) = number_at(operands, 0) {
                        text.set_rise(rise);
                    }
                }
                "Tj" => self.show_string(&mut text, operands.first(), &ctm),
                "'" => {
                    text.next_line();
                    self.show_string(&mut text, operands.first(), &ctm);
                }
                "\"" => {
                    text.next_line();
                    self.show_string(&mut text, operands.get(2), &ctm);
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show_array(&mut text, items, &ctm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name, resources, &ctm, depth)?;
                    }
                }
                "BI" => {
                    if let Some(Object::Stream(stream)) = operands.first() {
                        self.push_image("inline", stream);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn show_string(&mut self, text: &mut TextState, operand: Option<&Object>, ctm: &Matrix) {
        let Some(Object::String(bytes, _)) = operand else {
            return;
        };
        let decoded = decode_pdf_string(bytes);
        let glyphs = decoded.chars().count();
        if !decoded.trim().is_empty() {
            self.content.runs.push(text.run(decoded, ctm));
        }
        text.advance(glyphs);
    }

    fn show_array(&mut self, text: &mut TextState, items: &[Object], ctm: &Matrix) {
        let start = text.clone();
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = decode_pdf_string(bytes);
                    text.advance(decoded.chars().count());
                    combined.push_str(&decoded);
                }
                other => {
                    if let Some(adjustment) = as_number(other) {
                        if adjustment < WORD_GAP_THOUSANDTHS && !combined.ends_with(' ') {
                            combined.push(' ');
                        }
                        text.adjust(adjustment);
                    }
                }
            }
        }
        let trimmed = combined.trim_end();
        if !trimmed.is_empty() {
            self.content.runs.push(start.run(trimmed.to_string(), ctm));
        }
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: &Matrix,
        depth: usize,
    ) -> Result<()> {
        let document = self.document;
        let Some(stream) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|object| resolve_dict(document, object))
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|object| resolve(document, object))
            .and_then(|object| object.as_stream().ok())
        else {
            debug!(page = self.page, name = %String::from_utf8_lossy(name), "XObject not found");
            return Ok(());
        };

        let label = String::from_utf8_lossy(name).into_owned();
        match stream.dict.get(b"Subtype").ok().and_then(|s| name_of(document, s)) {
            Some(b"Image") => self.push_image(&label, stream),
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|object| resolve(document, object))
                    .and_then(|object| object.as_array().ok())
                    .and_then(|values| Matrix::from_operands(values))
                    .unwrap_or_default();
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|object| resolve_dict(document, object))
                    .or(resources);
                let bytes = stream_data(stream).map_err(|detail| FolioError::Extraction {
                    page: self.page,
                    detail: format!("form {label}: {detail}"),
                })?;
                self.walk(&bytes, form_resources, form_matrix.multiply(ctm), depth + 1)?;
            }
            Some(b"Form") => warn!(page = self.page, form = %label, "Form nesting too deep, skipped"),
            _ => {}
        }
        Ok(())
    }

    fn push_image(&mut self, label: &str, stream: &Stream) {
        match read_image(self.document, label, stream) {
            Ok(image) => self.content.images.push(image),
            Err(detail) => warn!(page = self.page, image = label, %detail, "Image skipped"),
        }
    }
}

/// Stream data with its filters removed.
fn stream_data(stream: &Stream) -> std::result::Result<Vec<u8>, String> {
    if stream.dict.has(b"Filter") || stream.dict.has(b"F") {
        stream
            .decompressed_content()
            .map_err(|err| format!("cannot decompress: {err}"))
    } else {
        Ok(stream.content.clone())
    }
}

/// Look up an image dictionary entry by its full or inline-abbreviated key.
fn entry<'d>(dict: &'d Dictionary, full: &[u8], short: &[u8]) -> Option<&'d Object> {
    dict.get(full).or_else(|_| dict.get(short)).ok()
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match entry(dict, b"Filter", b"F").and_then(|object| resolve(doc, object)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| name_of(doc, item).map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Turn an image stream into raw samples plus a colorspace tag.
fn read_image(doc: &Document, label: &str, stream: &Stream) -> std::result::Result<RawImageObject, String> {
    let dict = &stream.dict;
    let dimension = |full: &[u8], short: &[u8]| {
        entry(dict, full, short)
            .and_then(|object| resolve(doc, object))
            .and_then(as_number)
            .filter(|value| *value > 0.0)
            .map(|value| value as u32)
    };
    let (Some(width), Some(height)) = (dimension(b"Width", b"W"), dimension(b"Height", b"H")) else {
        return Err("missing or invalid dimensions".into());
    };

    let is_mask = entry(dict, b"ImageMask", b"IM")
        .and_then(|object| object.as_bool().ok())
        .unwrap_or(false);
    if is_mask {
        return Ok(raw(label, width, height, ColorspaceTag::Other("stencil mask".into()), Vec::new()));
    }

    let filters = filter_names(doc, dict);
    if filters.iter().any(|f| f == b"DCTDecode" || f == b"DCT") {
        return decode_jpeg(label, stream, &filters);
    }

    let bits = entry(dict, b"BitsPerComponent", b"BPC")
        .and_then(|object| resolve(doc, object))
        .and_then(as_number)
        .unwrap_or(8.0) as u32;
    let mut colorspace = entry(dict, b"ColorSpace", b"CS")
        .map(|object| colorspace_tag(doc, object))
        .unwrap_or_else(|| ColorspaceTag::Other("unspecified".into()));
    if bits != 8 {
        colorspace = ColorspaceTag::Other(format!("{bits}-bit samples"));
    }

    let mut data = stream_data(stream)?;

    if colorspace == ColorspaceTag::Rgb {
        if let Some(alpha) = soft_mask(doc, dict, width, height) {
            if RawImageObject::sample_len(width, height, 3) == Some(data.len()) {
                data = merge_alpha(&data, &alpha);
                colorspace = ColorspaceTag::Rgba;
            }
        }
    }

    Ok(raw(label, width, height, colorspace, data))
}

fn raw(label: &str, width: u32, height: u32, colorspace: ColorspaceTag, data: Vec<u8>) -> RawImageObject {
    RawImageObject {
        name: label.to_string(),
        width,
        height,
        colorspace,
        data,
    }
}

/// JPEG data goes through the raster codec; the result is gray or RGB.
fn decode_jpeg(
    label: &str,
    stream: &Stream,
    filters: &[Vec<u8>],
) -> std::result::Result<RawImageObject, String> {
    if filters.len() != 1 {
        return Ok(raw(
            label,
            0,
            0,
            ColorspaceTag::Other("chained DCT filters".into()),
            Vec::new(),
        ));
    }
    let image = RasterImage::from_bytes(&stream.content).map_err(|err| err.to_string())?;
    let (width, height) = (image.width(), image.height());
    let dynamic = image.into_dynamic();
    if dynamic.color().channel_count() == 1 {
        Ok(raw(label, width, height, ColorspaceTag::Gray, dynamic.to_luma8().into_raw()))
    } else {
        Ok(raw(label, width, height, ColorspaceTag::Rgb, dynamic.to_rgb8().into_raw()))
    }
}

fn colorspace_tag(doc: &Document, object: &Object) -> ColorspaceTag {
    match resolve(doc, object) {
        Some(Object::Name(name)) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => ColorspaceTag::Gray,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => ColorspaceTag::Rgb,
            other => ColorspaceTag::Other(String::from_utf8_lossy(other).into_owned()),
        },
        Some(Object::Array(items)) => {
            let family = items.first().and_then(|item| name_of(doc, item));
            match family {
                Some(b"ICCBased") => {
                    let components = items
                        .get(1)
                        .and_then(|item| resolve_dict(doc, item))
                        .and_then(|dict| dict.get(b"N").ok())
                        .and_then(as_number)
                        .unwrap_or(0.0) as u32;
                    match components {
                        1 => ColorspaceTag::Gray,
                        3 => ColorspaceTag::Rgb,
                        n => ColorspaceTag::Other(format!("ICCBased N={n}")),
                    }
                }
                Some(b"CalGray") => ColorspaceTag::Gray,
                Some(b"CalRGB") => ColorspaceTag::Rgb,
                Some(other) => ColorspaceTag::Other(String::from_utf8_lossy(other).into_owned()),
                None => ColorspaceTag::Other("malformed colorspace array".into()),
            }
        }
        _ => ColorspaceTag::Other("unreadable colorspace".into()),
    }
}

/// Alpha samples from an 8-bit gray soft mask of the same size as the image.
fn soft_mask(doc: &Document, dict: &Dictionary, width: u32, height: u32) -> Option<Vec<u8>> {
    let mask = dict
        .get(b"SMask")
        .ok()
        .and_then(|object| resolve(doc, object))
        .and_then(|object| object.as_stream().ok())?;
    let size = |key: &[u8]| mask.dict.get(key).ok().and_then(as_number).map(|v| v as u32);
    if size(b"Width") != Some(width) || size(b"Height") != Some(height) {
        debug!("Soft mask size differs from image, ignored");
        return None;
    }
    let bits = mask.dict.get(b"BitsPerComponent").ok().and_then(as_number);
    if bits.is_some_and(|bits| bits != 8.0) {
        return None;
    }
    let expected = RawImageObject::sample_len(width, height, 1)?;
    stream_data(mask).ok().filter(|alpha| alpha.len() == expected)
}

fn merge_alpha(rgb: &[u8], alpha: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .zip(alpha)
        .flat_map(|(pixel, &a)| [pixel[0], pixel[1], pixel[2], a])
        .collect()
}
