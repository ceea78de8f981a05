// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembler — accumulate pages from several source documents into one
// output document and serialise it.

use folio_core::error::{FolioError, Result};
use lopdf::{Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument};

use super::reader::{PageCopier, PdfReader};

/// An output document under construction.
///
/// Pages are only ever appended; the order of [`append_document`] calls is
/// the order of pages in the result.
///
/// [`append_document`]: PdfAssembler::append_document
pub struct PdfAssembler {
    document: Document,
    pages_root: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PdfAssembler {
    pub fn new(title: &str) -> Self {
        let mut document = Document::with_version("1.7");
        let pages_root = document.new_object_id();
        document.objects.insert(
            pages_root,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0i64,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_root,
        });
        let info_id = document.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal("folio"),
        });
        document.trailer.set("Root", catalog_id);
        document.trailer.set("Info", info_id);

        Self {
            document,
            pages_root,
            page_ids: Vec::new(),
        }
    }

    /// Append every page of `source`, in source order. Returns the number of
    /// pages added.
    #[instrument(skip_all, fields(source_pages = source.page_count()))]
    pub fn append_document(&mut self, source: &PdfReader) -> Result<usize> {
        let mut copier = PageCopier::new(source.document());
        let mut added = 0;
        for page_id in source.page_ids() {
            let new_id = copier.copy_page(&mut self.document, page_id, self.pages_root)?;
            self.page_ids.push(new_id);
            added += 1;
        }
        debug!(added, total = self.page_ids.len(), "Source pages appended");
        Ok(added)
    }

    /// Page IDs of the output document, in order.
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Serialise the assembled document.
    pub fn save(mut self) -> Result<Vec<u8>> {
        self.document.compress();
        let mut buffer = Vec::new();
        self.document
            .save_to(&mut buffer)
            .map_err(|err| FolioError::OutputEncoding(format!("failed to write PDF: {err}")))?;
        info!(
            pages = self.page_ids.len(),
            bytes = buffer.len(),
            "Output document serialised"
        );
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::tests::pdf_fixture;

    #[test]
    fn appends_sources_in_call_order() {
        let first = PdfReader::from_bytes(&pdf_fixture(612.0, 792.0, &[0, 0])).unwrap();
        let second = PdfReader::from_bytes(&pdf_fixture(300.0, 300.0, &[90])).unwrap();

        let mut assembler = PdfAssembler::new("test");
        assert_eq!(assembler.append_document(&first).unwrap(), 2);
        assert_eq!(assembler.append_document(&second).unwrap(), 1);
        let bytes = assembler.save().unwrap();

        let output = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(output.page_count(), 3);
        assert_eq!(output.page_geometry(0).unwrap().width_pt, 612.0);
        let last = output.page_geometry(2).unwrap();
        assert_eq!((last.width_pt, last.rotation_deg), (300.0, 90));
    }

    #[test]
    fn shared_font_is_copied_once() {
        let source = PdfReader::from_bytes(&pdf_fixture(612.0, 792.0, &[0, 0, 0])).unwrap();
        let mut assembler = PdfAssembler::new("test");
        assembler.append_document(&source).unwrap();

        let fonts = assembler
            .document_mut()
            .objects
            .values()
            .filter(|object| {
                object
                    .as_dict()
                    .map(|dict| dict.has(b"BaseFont"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(fonts, 1);
    }
}
