// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX builder — write a reconstructed block sequence as a minimal
// WordprocessingML package.

use std::io::{Cursor, Write};

use folio_core::error::{FolioError, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, info, instrument};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::reconstruct::{Block, ImageBlock, OverlayBlock};

/// English Metric Units per pixel (at 96 dpi).
pub const EMU_PER_PX: i64 = 9525;
/// English Metric Units per point.
pub const EMU_PER_PT: i64 = 12700;

/// A4 portrait in twentieths of a point.
const A4_TWIPS: (u32, u32) = (11906, 16838);

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const IMAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const PICTURE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const DOCUMENT_NAMESPACES: [(&str, &str); 5] = [
    ("xmlns:w", "http://schemas.openxmlformats.org/wordprocessingml/2006/main"),
    ("xmlns:r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
    ("xmlns:wp", "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"),
    ("xmlns:a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    ("xmlns:pic", PICTURE_URI),
];

const NO_DISTANCE: [(&str, &str); 4] = [("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")];

type XmlWriter = Writer<Vec<u8>>;
type XmlResult<T> = std::result::Result<T, quick_xml::Error>;

/// Serialises blocks into a `.docx` archive.
pub struct DocxBuilder {
    max_image_width_px: u32,
}

/// Parts accumulated while walking the blocks.
struct Package {
    /// `word/document.xml`, open at `<w:body>` until `finish`.
    document: XmlWriter,
    /// PNG payloads; `media[i]` is `word/media/image{i+1}.png`, `rId{i+2}`.
    media: Vec<Vec<u8>>,
    /// Shared drawing ID counter (docPr ids must be unique).
    drawings: usize,
}

impl DocxBuilder {
    pub fn new(max_image_width_px: u32) -> Self {
        Self {
            max_image_width_px: max_image_width_px.max(1),
        }
    }

    /// Build the archive bytes.
    #[instrument(skip_all, fields(blocks = blocks.len()))]
    pub fn build(&self, blocks: &[Block]) -> Result<Vec<u8>> {
        let mut package = Package::new().map_err(xml_error)?;
        for block in blocks {
            match block {
                Block::Text(text) => package.text_paragraph(text).map_err(xml_error)?,
                Block::PageBreak => package.page_break().map_err(xml_error)?,
                Block::Image(image) => self.inline_image(&mut package, image)?,
                Block::Overlay(overlay) => package.anchored_overlay(overlay).map_err(xml_error)?,
            }
        }

        let bytes = package.finish()?;
        info!(bytes = bytes.len(), "DOCX package written");
        Ok(bytes)
    }

    fn inline_image(&self, package: &mut Package, image: &ImageBlock) -> Result<()> {
        let (width_px, height_px) = self.display_size(image.width, image.height);
        let rel_id = package.add_media(image.to_png()?);
        let id = package.next_drawing_id();
        let (cx, cy) = (width_px as i64 * EMU_PER_PX, height_px as i64 * EMU_PER_PX);

        run_paragraph(&mut package.document, |w| {
            w.create_element("w:drawing")
                .write_inner_content(|w| -> XmlResult<()> {
                    w.create_element("wp:inline")
                        .with_attributes(NO_DISTANCE)
                        .write_inner_content(|w| -> XmlResult<()> {
                            extent(w, cx, cy)?;
                            doc_properties(w, id, &format!("Picture {id}"))?;
                            graphic(w, id, &rel_id, cx, cy)
                        })?;
                    Ok(())
                })?;
            Ok(())
        })
        .map_err(xml_error)
    }

    /// Displayed size in pixels: at most `max_image_width_px` wide, aspect
    /// ratio kept.
    pub fn display_size(&self, width: u32, height: u32) -> (u32, u32) {
        if width <= self.max_image_width_px || width == 0 {
            return (width, height);
        }
        let scaled = (self.max_image_width_px as f64 * height as f64 / width as f64).round();
        (self.max_image_width_px, scaled.max(1.0) as u32)
    }
}

impl Package {
    fn new() -> XmlResult<Self> {
        let mut document = xml_part()?;
        document.write_event(Event::Start(
            BytesStart::new("w:document").with_attributes(DOCUMENT_NAMESPACES),
        ))?;
        document.write_event(Event::Start(BytesStart::new("w:body")))?;
        Ok(Self {
            document,
            media: Vec::new(),
            drawings: 0,
        })
    }

    fn next_drawing_id(&mut self) -> usize {
        self.drawings += 1;
        self.drawings
    }

    /// Register a PNG payload, reusing an identical earlier one.
    fn add_media(&mut self, png: Vec<u8>) -> String {
        let index = match self.media.iter().position(|existing| *existing == png) {
            Some(index) => index,
            None => {
                self.media.push(png);
                self.media.len() - 1
            }
        };
        format!("rId{}", index + 2)
    }

    fn text_paragraph(&mut self, text: &str) -> XmlResult<()> {
        run_paragraph(&mut self.document, |w| {
            w.create_element("w:t")
                .with_attribute(("xml:space", "preserve"))
                .write_text_content(BytesText::new(text))?;
            Ok(())
        })
    }

    fn page_break(&mut self) -> XmlResult<()> {
        run_paragraph(&mut self.document, |w| {
            w.create_element("w:br")
                .with_attribute(("w:type", "page"))
                .write_empty()?;
            Ok(())
        })
    }

    fn anchored_overlay(&mut self, overlay: &OverlayBlock) -> XmlResult<()> {
        let rel_id = self.add_media(overlay.png.clone());
        let id = self.next_drawing_id();
        let emu = |pt: f64| (pt * EMU_PER_PT as f64).round() as i64;
        let (x, y) = (emu(overlay.offset_x_pt), emu(overlay.offset_y_pt));
        let (cx, cy) = (emu(overlay.width_pt), emu(overlay.height_pt));
        let layer = id.to_string();

        run_paragraph(&mut self.document, |w| {
            w.create_element("w:drawing")
                .write_inner_content(|w| -> XmlResult<()> {
                    w.create_element("wp:anchor")
                        .with_attributes(NO_DISTANCE)
                        .with_attributes([
                            ("simplePos", "0"),
                            ("relativeHeight", layer.as_str()),
                            ("behindDoc", "0"),
                            ("locked", "0"),
                            ("layoutInCell", "1"),
                            ("allowOverlap", "1"),
                        ])
                        .write_inner_content(|w| -> XmlResult<()> {
                            w.create_element("wp:simplePos")
                                .with_attributes([("x", "0"), ("y", "0")])
                                .write_empty()?;
                            page_offset(w, "wp:positionH", x)?;
                            page_offset(w, "wp:positionV", y)?;
                            extent(w, cx, cy)?;
                            w.create_element("wp:effectExtent")
                                .with_attributes([("l", "0"), ("t", "0"), ("r", "0"), ("b", "0")])
                                .write_empty()?;
                            w.create_element("wp:wrapNone").write_empty()?;
                            doc_properties(w, id, &format!("Signature {id}"))?;
                            w.create_element("wp:cNvGraphicFramePr").write_empty()?;
                            graphic(w, id, &rel_id, cx, cy)
                        })?;
                    Ok(())
                })?;
            Ok(())
        })
    }

    /// Close the body with an A4 section and return `word/document.xml`.
    fn document_xml(mut self) -> XmlResult<(Vec<u8>, Vec<Vec<u8>>)> {
        let (width, height) = (A4_TWIPS.0.to_string(), A4_TWIPS.1.to_string());
        self.document
            .create_element("w:sectPr")
            .write_inner_content(|w| -> XmlResult<()> {
                w.create_element("w:pgSz")
                    .with_attributes([("w:w", width.as_str()), ("w:h", height.as_str())])
                    .write_empty()?;
                w.create_element("w:pgMar")
                    .with_attributes([
                        ("w:top", "1440"),
                        ("w:right", "1440"),
                        ("w:bottom", "1440"),
                        ("w:left", "1440"),
                        ("w:header", "708"),
                        ("w:footer", "708"),
                        ("w:gutter", "0"),
                    ])
                    .write_empty()?;
                Ok(())
            })?;
        self.document.write_event(Event::End(BytesEnd::new("w:body")))?;
        self.document.write_event(Event::End(BytesEnd::new("w:document")))?;
        Ok((self.document.into_inner(), self.media))
    }

    fn finish(self) -> Result<Vec<u8>> {
        let (document, media) = self.document_xml().map_err(xml_error)?;
        let image_rels: Vec<(String, String)> = (1..=media.len())
            .map(|n| (format!("rId{}", n + 1), format!("media/image{n}.png")))
            .collect();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        write_part(&mut zip, "[Content_Types].xml", &content_types().map_err(xml_error)?)?;
        write_part(
            &mut zip,
            "_rels/.rels",
            &relationships(OFFICE_DOCUMENT_REL, &[("rId1".into(), "word/document.xml".into())])
                .map_err(xml_error)?,
        )?;
        write_part(&mut zip, "word/document.xml", &document)?;
        write_part(
            &mut zip,
            "word/_rels/document.xml.rels",
            &relationships(IMAGE_REL, &image_rels).map_err(xml_error)?,
        )?;
        for (index, png) in media.iter().enumerate() {
            write_part(&mut zip, &format!("word/media/image{}.png", index + 1), png)?;
        }
        debug!(media = media.len(), "Package parts written");

        let cursor = zip
            .finish()
            .map_err(|err| FolioError::OutputEncoding(format!("cannot finish DOCX archive: {err}")))?;
        Ok(cursor.into_inner())
    }
}

fn xml_error(err: quick_xml::Error) -> FolioError {
    FolioError::OutputEncoding(format!("cannot write WordprocessingML: {err}"))
}

/// A writer that has already emitted the XML declaration.
fn xml_part() -> XmlResult<XmlWriter> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn content_types() -> XmlResult<Vec<u8>> {
    let mut writer = xml_part()?;
    writer
        .create_element("Types")
        .with_attribute(("xmlns", CONTENT_TYPES_NS))
        .write_inner_content(|w| -> XmlResult<()> {
            for (extension, content_type) in [
                ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
                ("xml", "application/xml"),
                ("png", "image/png"),
            ] {
                w.create_element("Default")
                    .with_attributes([("Extension", extension), ("ContentType", content_type)])
                    .write_empty()?;
            }
            w.create_element("Override")
                .with_attributes([
                    ("PartName", "/word/document.xml"),
                    (
                        "ContentType",
                        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
                    ),
                ])
                .write_empty()?;
            Ok(())
        })?;
    Ok(writer.into_inner())
}

/// A relationships part where every entry has type `rel_type`.
fn relationships(rel_type: &str, targets: &[(String, String)]) -> XmlResult<Vec<u8>> {
    let mut writer = xml_part()?;
    writer
        .create_element("Relationships")
        .with_attribute(("xmlns", RELATIONSHIPS_NS))
        .write_inner_content(|w| -> XmlResult<()> {
            for (id, target) in targets {
                w.create_element("Relationship")
                    .with_attributes([("Id", id.as_str()), ("Type", rel_type), ("Target", target.as_str())])
                    .write_empty()?;
            }
            Ok(())
        })?;
    Ok(writer.into_inner())
}

/// `<w:p><w:r>...</w:r></w:p>` around whatever `content` writes.
fn run_paragraph<F>(writer: &mut XmlWriter, content: F) -> XmlResult<()>
where
    F: FnOnce(&mut XmlWriter) -> XmlResult<()>,
{
    writer
        .create_element("w:p")
        .write_inner_content(|w| -> XmlResult<()> {
            w.create_element("w:r").write_inner_content(content)?;
            Ok(())
        })?;
    Ok(())
}

fn extent(writer: &mut XmlWriter, cx: i64, cy: i64) -> XmlResult<()> {
    let (cx, cy) = (cx.to_string(), cy.to_string());
    writer
        .create_element("wp:extent")
        .with_attributes([("cx", cx.as_str()), ("cy", cy.as_str())])
        .write_empty()?;
    Ok(())
}

fn doc_properties(writer: &mut XmlWriter, id: usize, name: &str) -> XmlResult<()> {
    let id = id.to_string();
    writer
        .create_element("wp:docPr")
        .with_attributes([("id", id.as_str()), ("name", name)])
        .write_empty()?;
    Ok(())
}

/// `<wp:positionH>` or `<wp:positionV>` measured from the page edge.
fn page_offset(writer: &mut XmlWriter, axis: &str, emu: i64) -> XmlResult<()> {
    let offset = emu.to_string();
    writer
        .create_element(axis)
        .with_attribute(("relativeFrom", "page"))
        .write_inner_content(|w| -> XmlResult<()> {
            w.create_element("wp:posOffset")
                .write_text_content(BytesText::new(&offset))?;
            Ok(())
        })?;
    Ok(())
}

/// The `<a:graphic>` element shared by inline and anchored pictures.
fn graphic(writer: &mut XmlWriter, id: usize, rel_id: &str, cx: i64, cy: i64) -> XmlResult<()> {
    let id_text = id.to_string();
    let file_name = format!("image{id}.png");
    let (cx, cy) = (cx.to_string(), cy.to_string());
    writer
        .create_element("a:graphic")
        .write_inner_content(|w| -> XmlResult<()> {
            w.create_element("a:graphicData")
                .with_attribute(("uri", PICTURE_URI))
                .write_inner_content(|w| -> XmlResult<()> {
                    w.create_element("pic:pic")
                        .write_inner_content(|w| -> XmlResult<()> {
                            w.create_element("pic:nvPicPr")
                                .write_inner_content(|w| -> XmlResult<()> {
                                    w.create_element("pic:cNvPr")
                                        .with_attributes([("id", id_text.as_str()), ("name", file_name.as_str())])
                                        .write_empty()?;
                                    w.create_element("pic:cNvPicPr").write_empty()?;
                                    Ok(())
                                })?;
                            w.create_element("pic:blipFill")
                                .write_inner_content(|w| -> XmlResult<()> {
                                    w.create_element("a:blip")
                                        .with_attribute(("r:embed", rel_id))
                                        .write_empty()?;
                                    w.create_element("a:stretch")
                                        .write_inner_content(|w| -> XmlResult<()> {
                                            w.create_element("a:fillRect").write_empty()?;
                                            Ok(())
                                        })?;
                                    Ok(())
                                })?;
                            w.create_element("pic:spPr")
                                .write_inner_content(|w| -> XmlResult<()> {
                                    w.create_element("a:xfrm")
                                        .write_inner_content(|w| -> XmlResult<()> {
                                            w.create_element("a:off")
                                                .with_attributes([("x", "0"), ("y", "0")])
                                                .write_empty()?;
                                            w.create_element("a:ext")
                                                .with_attributes([("cx", cx.as_str()), ("cy", cy.as_str())])
                                                .write_empty()?;
                                            Ok(())
                                        })?;
                                    w.create_element("a:prstGeom")
                                        .with_attribute(("prst", "rect"))
                                        .write_inner_content(|w| -> XmlResult<()> {
                                            w.create_element("a:avLst").write_empty()?;
                                            Ok(())
                                        })?;
                                    Ok(())
                                })?;
                            Ok(())
                        })?;
                    Ok(())
                })?;
            Ok(())
        })?;
    Ok(())
}

fn write_part(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    data: &[u8],
) -> Result<()> {
    zip.start_file(name, SimpleFileOptions::default())
        .map_err(|err| FolioError::OutputEncoding(format!("cannot add {name}: {err}")))?;
    zip.write_all(data)
        .map_err(|err| FolioError::OutputEncoding(format!("cannot write {name}: {err}")))
}
