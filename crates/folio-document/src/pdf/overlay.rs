// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay stamping — draw a signature image onto existing pages of a lopdf
// document, placed through the rotation transform and turned with the page so
// it reads upright.

use folio_core::error::{FolioError, Result};
use folio_core::types::{OverlayProfile, Position};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use super::objects::resolve_dict;
use super::reader::page_geometry;
use super::xobject::embed_image;
use crate::image::RasterImage;
use crate::rotation::{normalize_rotation, place_on_page};

/// Resource name prefix for the stamped image XObject.
const XOBJECT_PREFIX: &str = "FolioOverlay";

/// Stamp `overlay` onto the pages of `page_ids` selected by its scope.
///
/// Each target page is measured individually; nothing about one page's size
/// or rotation carries over to the next.
#[instrument(skip_all, fields(pages = page_ids.len(), scope = ?overlay.scope))]
pub fn stamp_overlay(
    doc: &mut Document,
    page_ids: &[ObjectId],
    overlay: &OverlayProfile,
) -> Result<()> {
    overlay.validate()?;
    let targets = overlay.scope.resolve(page_ids.len());
    if targets.is_empty() {
        return Ok(());
    }

    let image = RasterImage::from_bytes(&overlay.image)?;
    let width = overlay.width_points;
    let height = width * image.height() as f64 / image.width() as f64;
    let xobject_id = embed_image(doc, &image)?;

    for index in targets {
        let page_id = page_ids[index];
        let geometry = page_geometry(doc, page_id)?;
        let origin = place_on_page(&geometry, overlay.x_percent, overlay.y_percent)?;
        let matrix = overlay_matrix(geometry.rotation_deg, width, height, origin)?;

        let name = attach_xobject(doc, page_id, xobject_id)?;
        append_drawing(doc, page_id, &name, matrix)?;
        debug!(
            page = index + 1,
            rotation = geometry.rotation_deg,
            x = origin.x,
            y = origin.y,
            "Overlay stamped"
        );
    }

    info!(width, height, "Overlay applied");
    Ok(())
}

/// Transformation matrix mapping the image unit square to a `width` x
/// `height` box at `origin`, turned counter-clockwise by `rotation_deg`.
pub fn overlay_matrix(
    rotation_deg: i64,
    width: f64,
    height: f64,
    origin: Position,
) -> Result<[f64; 6]> {
    let (cos, sin) = match normalize_rotation(rotation_deg)? {
        0 => (1.0, 0.0),
        90 => (0.0, 1.0),
        180 => (-1.0, 0.0),
        270 => (0.0, -1.0),
        other => return Err(FolioError::UnsupportedRotation(other)),
    };
    Ok([
        width * cos,
        width * sin,
        -height * sin,
        height * cos,
        origin.x,
        origin.y,
    ])
}

/// Register `xobject_id` in the page's own /Resources under a fresh name.
fn attach_xobject(doc: &mut Document, page_id: ObjectId, xobject_id: ObjectId) -> Result<String> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|err| FolioError::Composition(format!("cannot read page {page_id:?}: {err}")))?;

    let mut resources = page
        .get(b"Resources")
        .ok()
        .and_then(|object| resolve_dict(doc, object))
        .cloned()
        .unwrap_or_default();
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|object| resolve_dict(doc, object))
        .cloned()
        .unwrap_or_default();

    let mut suffix = 0;
    let name = loop {
        let candidate = format!("{XOBJECT_PREFIX}{suffix}");
        if !xobjects.has(candidate.as_bytes()) {
            break candidate;
        }
        suffix += 1;
    };

    xobjects.set(name.clone(), Object::Reference(xobject_id));
    resources.set("XObject", xobjects);

    page_dict_mut(doc, page_id)?.set("Resources", resources);
    Ok(name)
}

/// Isolate the existing content in a `q`/`Q` pair, then append the overlay
/// drawing after it.
fn append_drawing(doc: &mut Document, page_id: ObjectId, name: &str, matrix: [f64; 6]) -> Result<()> {
    let existing: Vec<Object> = match page_dict_mut(doc, page_id)?.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(single) => vec![single.clone()],
        Err(_) => Vec::new(),
    };

    let prefix = Content {
        operations: vec![Operation::new("q", vec![])],
    };
    let drawing = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                matrix.iter().map(|value| Object::Real(*value as f32)).collect(),
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };

    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), encode(&prefix)?));
    // Leading newline: the previous stream may end mid-line.
    let mut drawing_bytes = b"\n".to_vec();
    drawing_bytes.extend(encode(&drawing)?);
    let drawing_id = doc.add_object(Stream::new(Dictionary::new(), drawing_bytes));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing);
    contents.push(Object::Reference(drawing_id));
    page_dict_mut(doc, page_id)?.set("Contents", contents);
    Ok(())
}

fn encode(content: &Content) -> Result<Vec<u8>> {
    content
        .encode()
        .map_err(|err| FolioError::OutputEncoding(format!("content stream encoding failed: {err}")))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| FolioError::Composition(format!("cannot update page {page_id:?}: {err}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::image::codec::tests::png_fixture;
    use crate::pdf::reader::tests::pdf_fixture;
    use folio_core::types::OverlayScope;

    /// Concatenated, decoded content of a page.
    pub(crate) fn page_content(doc: &Document, page_id: ObjectId) -> Content {
        let bytes = doc.get_page_content(page_id).unwrap();
        Content::decode(&bytes).unwrap()
    }

    /// The `cm` operands that precede the overlay `Do` on a page, if any.
    pub(crate) fn overlay_cm(doc: &Document, page_id: ObjectId) -> Option<Vec<f64>> {
        let ops = page_content(doc, page_id).operations;
        ops.windows(2).find_map(|pair| match (&pair[0], &pair[1]) {
            (cm, draw) if cm.operator == "cm" && draw.operator == "Do" => {
                let is_overlay = matches!(
                    draw.operands.first(),
                    Some(Object::Name(name)) if name.starts_with(XOBJECT_PREFIX.as_bytes())
                );
                is_overlay.then(|| {
                    cm.operands
                        .iter()
                        .filter_map(crate::pdf::objects::as_number)
                        .collect()
                })
            }
            _ => None,
        })
    }

    fn load(rotations: &[i64]) -> (Document, Vec<ObjectId>) {
        let doc = Document::load_mem(&pdf_fixture(600.0, 800.0, rotations)).unwrap();
        let ids = doc.get_pages().into_values().collect();
        (doc, ids)
    }

    #[test]
    fn matrix_turns_with_page() {
        let origin = Position { x: 10.0, y: 20.0 };
        assert_eq!(
            overlay_matrix(0, 150.0, 50.0, origin).unwrap(),
            [150.0, 0.0, 0.0, 50.0, 10.0, 20.0]
        );
        assert_eq!(
            overlay_matrix(90, 150.0, 50.0, origin).unwrap(),
            [0.0, 150.0, -50.0, 0.0, 10.0, 20.0]
        );
        assert_eq!(
            overlay_matrix(-90, 150.0, 50.0, origin).unwrap(),
            [0.0, -150.0, 50.0, 0.0, 10.0, 20.0]
        );
    }

    #[test]
    fn stamps_every_page_at_rotation_aware_position() {
        let (mut doc, ids) = load(&[0, 90]);
        let mut overlay = OverlayProfile::new(png_fixture(30, 10));
        overlay.x_percent = 0.5;
        overlay.y_percent = 0.25;
        overlay.width_points = 120.0;

        stamp_overlay(&mut doc, &ids, &overlay).unwrap();

        let first = overlay_cm(&doc, ids[0]).unwrap();
        assert!((first[0] - 120.0).abs() < 1e-3);
        assert!((first[3] - 40.0).abs() < 1e-3);
        assert!((first[4] - 300.0).abs() < 1e-3);
        assert!((first[5] - 200.0).abs() < 1e-3);

        let second = overlay_cm(&doc, ids[1]).unwrap();
        assert!((second[4] - 150.0).abs() < 1e-3);
        assert!((second[5] - 400.0).abs() < 1e-3);
    }

    #[test]
    fn scope_limits_targets() {
        let (mut doc, ids) = load(&[0, 0, 0]);
        let mut overlay = OverlayProfile::new(png_fixture(10, 10));
        overlay.scope = OverlayScope::Last;

        stamp_overlay(&mut doc, &ids, &overlay).unwrap();

        assert!(overlay_cm(&doc, ids[0]).is_none());
        assert!(overlay_cm(&doc, ids[1]).is_none());
        assert!(overlay_cm(&doc, ids[2]).is_some());
    }

    #[test]
    fn original_text_survives_stamping() {
        let (mut doc, ids) = load(&[0]);
        stamp_overlay(&mut doc, &ids, &OverlayProfile::new(png_fixture(10, 10))).unwrap();

        let ops = page_content(&doc, ids[0]).operations;
        assert!(ops.iter().any(|op| op.operator == "Tj"));
        assert_eq!(ops.first().map(|op| op.operator.as_str()), Some("q"));
    }
}
