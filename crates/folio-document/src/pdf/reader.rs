// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open existing PDF documents, inspect page geometry, and copy
// pages verbatim into another document using the `lopdf` crate.

use std::collections::HashMap;

use folio_core::error::{FolioError, Result};
use folio_core::types::PageGeometry;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

use super::objects::{as_number, resolve, resolve_inherited};
use crate::rotation::normalize_rotation;

/// Page attributes that may live on an ancestor /Pages node and must be
/// materialised when a page is moved into another document.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// MediaBox assumed when a page declares none (US Letter).
const DEFAULT_MEDIA_BOX: (f64, f64) = (612.0, 792.0);

/// Reads an existing PDF held in memory.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader from raw PDF bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            FolioError::SourceParse(format!("failed to load PDF from memory: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Page object IDs in reading order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }

    /// Geometry of a page (0-indexed).
    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry> {
        let page_id = self.page_ids().get(index).copied().ok_or_else(|| {
            FolioError::InputValidation(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                self.page_count()
            ))
        })?;
        page_geometry(&self.document, page_id)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// Read the size and rotation of a page, honouring inherited attributes.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let (width_pt, height_pt) = resolve_inherited(doc, page_id, b"MediaBox")
        .and_then(|object| resolve(doc, object))
        .and_then(|object| object.as_array().ok())
        .and_then(|values| {
            let numbers: Vec<f64> = values.iter().filter_map(as_number).collect();
            match numbers.as_slice() {
                [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
                _ => None,
            }
        })
        .unwrap_or_else(|| {
            debug!(?page_id, "page has no usable MediaBox, assuming Letter");
            DEFAULT_MEDIA_BOX
        });

    let declared_rotation = resolve_inherited(doc, page_id, b"Rotate")
        .and_then(|object| resolve(doc, object))
        .and_then(as_number)
        .unwrap_or(0.0);
    let rotation_deg = normalize_rotation(declared_rotation.round() as i64)?;

    Ok(PageGeometry {
        width_pt,
        height_pt,
        rotation_deg,
    })
}

/// Copies pages from one source document into a target document.
///
/// Every object a page references is copied once: objects shared between
/// pages of the same source (fonts, images) are not duplicated, and cycles
/// (annotations pointing back at their page) terminate.
pub struct PageCopier<'a> {
    source: &'a Document,
    /// Source object ID -> target object ID.
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    /// Copy a single page into `target`, appending it as the last kid of
    /// the `pages_root` node. Returns the page's ID in `target`.
    pub fn copy_page(
        &mut self,
        target: &mut Document,
        page_id: ObjectId,
        pages_root: ObjectId,
    ) -> Result<ObjectId> {
        let page_dict = self
            .source
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|err| {
                FolioError::SourceParse(format!("cannot read page object {page_id:?}: {err}"))
            })?;

        let new_id = target.new_object_id();
        self.copied.insert(page_id, new_id);

        let mut new_dict = Dictionary::new();
        for (key, value) in page_dict.iter() {
            // /Parent is patched below to point at the target's page tree.
            if key == b"Parent" {
                continue;
            }
            new_dict.set(key.clone(), self.copy_object(target, value));
        }
        for key in INHERITABLE_KEYS {
            if new_dict.has(key) {
                continue;
            }
            if let Some(value) = resolve_inherited(self.source, page_id, key) {
                new_dict.set(key.to_vec(), self.copy_object(target, value));
            }
        }
        new_dict.set("Parent", Object::Reference(pages_root));
        target
            .objects
            .insert(new_id, Object::Dictionary(new_dict));

        append_kid(target, pages_root, new_id)?;
        Ok(new_id)
    }

    /// Deep-copy an object into `target`, following references.
    ///
    /// /Parent entries inside nested dictionaries are dropped so that copying
    /// one page never drags in the rest of the source page tree.
    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(ref_id) => {
                if let Some(existing) = self.copied.get(ref_id) {
                    return Object::Reference(*existing);
                }
                let referenced = match self.source.get_object(*ref_id) {
                    Ok(referenced) => referenced,
                    Err(err) => {
                        warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                        return Object::Null;
                    }
                };
                let new_id = target.new_object_id();
                self.copied.insert(*ref_id, new_id);
                let cloned = self.copy_object(target, referenced);
                target.objects.insert(new_id, cloned);
                Object::Reference(new_id)
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(target, &stream.dict);
                let mut copy = lopdf::Stream::new(dict, stream.content.clone());
                copy.allows_compression = stream.allows_compression;
                Object::Stream(copy)
            }
            // Boolean, Integer, Real, String, Name, Null.
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            new_dict.set(key.clone(), self.copy_object(target, value));
        }
        new_dict
    }
}

/// Add `page_id` to the /Kids array of `pages_root` and bump /Count.
fn append_kid(target: &mut Document, pages_root: ObjectId, page_id: ObjectId) -> Result<()> {
    let pages_dict = target
        .get_object_mut(pages_root)
        .and_then(Object::as_dict_mut)
        .map_err(|err| FolioError::Composition(format!("output page tree is broken: {err}")))?;

    if !matches!(pages_dict.get(b"Kids"), Ok(Object::Array(_))) {
        pages_dict.set("Kids", Vec::<Object>::new());
    }
    if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
        kids.push(Object::Reference(page_id));
    }
    let count = pages_dict
        .get(b"Count")
        .ok()
        .and_then(|count| count.as_i64().ok())
        .unwrap_or(0);
    pages_dict.set("Count", count + 1);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    /// Build a PDF with one page per entry of `rotations`, each page carrying
    /// a text content stream naming its index so copies can be traced.
    pub(crate) fn pdf_fixture(width: f64, height: f64, rotations: &[i64]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id: ObjectId = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for (index, rotation) in rotations.iter().enumerate() {
            let content = format!("BT /F1 12 Tf 72 700 Td (page {}) Tj ET", index + 1);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Rotate" => *rotation,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => rotations.len() as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    #[test]
    fn reads_page_count_and_geometry() {
        let reader = PdfReader::from_bytes(&pdf_fixture(612.0, 792.0, &[0, 90, -90])).unwrap();
        assert_eq!(reader.page_count(), 3);

        let first = reader.page_geometry(0).unwrap();
        assert!((first.width_pt - 612.0).abs() < 1e-3);
        assert!((first.height_pt - 792.0).abs() < 1e-3);
        assert_eq!(first.rotation_deg, 0);
        assert_eq!(reader.page_geometry(1).unwrap().rotation_deg, 90);
        assert_eq!(reader.page_geometry(2).unwrap().rotation_deg, 270);
        assert!(reader.page_geometry(3).is_err());
    }

    #[test]
    fn odd_rotation_is_reported() {
        let reader = PdfReader::from_bytes(&pdf_fixture(612.0, 792.0, &[45])).unwrap();
        assert!(matches!(
            reader.page_geometry(0),
            Err(FolioError::UnsupportedRotation(45))
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        assert!(matches!(
            PdfReader::from_bytes(b"%PDF-1.5 this is not a pdf"),
            Err(FolioError::SourceParse(_))
        ));
    }

    #[test]
    fn copied_page_materialises_inherited_attributes() {
        // Source: MediaBox and Rotate live on the /Pages node only.
        let mut source = Document::with_version("1.5");
        let pages_id = source.new_object_id();
        let page_id = source.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        source.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1i64,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
                "Rotate" => 180i64,
            }),
        );

        let mut target = Document::with_version("1.5");
        let target_pages = target.new_object_id();
        target.objects.insert(
            target_pages,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0i64,
            }),
        );

        let mut copier = PageCopier::new(&source);
        let copied = copier.copy_page(&mut target, page_id, target_pages).unwrap();

        let geometry = page_geometry(&target, copied).unwrap();
        assert_eq!(geometry.width_pt, 300.0);
        assert_eq!(geometry.height_pt, 400.0);
        assert_eq!(geometry.rotation_deg, 180);

        let pages = target.get_object(target_pages).unwrap().as_dict().unwrap();
        assert_eq!(pages.get(b"Count").unwrap().as_i64().unwrap(), 1);
    }
}
