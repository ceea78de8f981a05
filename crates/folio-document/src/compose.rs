// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page composition — assemble existing PDFs and raster images, in caller
// order, into a single output document, then stamp the overlay.

use folio_core::config::ConversionConfig;
use folio_core::error::{FolioError, Result};
use folio_core::types::{OverlayProfile, SourceItem, SourceKind};
use tracing::{debug, info, instrument};

use crate::image::RasterImage;
use crate::pdf::{PdfAssembler, PdfReader, PdfWriter, stamp_overlay};

/// Items sorted by ascending `order`; ties keep their list position.
pub fn ordered(items: &[SourceItem]) -> Vec<&SourceItem> {
    let mut sorted: Vec<&SourceItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.order);
    sorted
}

/// An output document part way through composition.
pub struct Composition {
    assembler: PdfAssembler,
    items: usize,
}

impl Composition {
    pub fn page_count(&self) -> usize {
        self.assembler.page_count()
    }
}

/// Builds composed documents according to a [`ConversionConfig`].
pub struct PageComposer {
    writer: PdfWriter,
    title: String,
}

impl PageComposer {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            writer: PdfWriter::from_config(config),
            title: config.title.clone(),
        }
    }

    /// Compose `items` and apply `overlay` to the pages it selects.
    ///
    /// Any failing item aborts the whole composition; no partial output is
    /// returned.
    #[instrument(skip_all, fields(items = items.len(), overlay = overlay.is_some()))]
    pub fn compose(&self, items: &[SourceItem], overlay: Option<&OverlayProfile>) -> Result<Vec<u8>> {
        if items.is_empty() {
            return Err(FolioError::InputValidation("nothing to compose".into()));
        }
        let mut composition = self.begin();
        for item in ordered(items) {
            self.add(&mut composition, item)?;
        }
        self.finish(composition, overlay)
    }

    pub fn begin(&self) -> Composition {
        Composition {
            assembler: PdfAssembler::new(&self.title),
            items: 0,
        }
    }

    /// Append the pages contributed by one item.
    pub fn add(&self, composition: &mut Composition, item: &SourceItem) -> Result<()> {
        let added = match item.kind {
            SourceKind::Existing => {
                let reader = PdfReader::from_bytes(&item.bytes).map_err(|err| item_failure(item, err))?;
                composition
                    .assembler
                    .append_document(&reader)
                    .map_err(|err| item_failure(item, err))?
            }
            SourceKind::Raster => {
                let image = RasterImage::from_bytes(&item.bytes).map_err(|err| match err {
                    FolioError::UnsupportedImageFormat(_) => err,
                    other => item_failure(item, other),
                })?;
                let layout = item.layout.unwrap_or_default();
                let page = self.writer.create_image_page(&image, &layout)?;
                drop(image);
                let reader = PdfReader::from_bytes(&page).map_err(|err| item_failure(item, err))?;
                composition.assembler.append_document(&reader)?
            }
            SourceKind::Structured => {
                return Err(FolioError::InputValidation(format!(
                    "item {} ({}) is a structured document and cannot be composed",
                    item.order, item.name
                )));
            }
        };
        composition.items += 1;
        debug!(order = item.order, name = %item.name, pages = added, "Item composed");
        Ok(())
    }

    /// Stamp the overlay and serialise.
    pub fn finish(&self, mut composition: Composition, overlay: Option<&OverlayProfile>) -> Result<Vec<u8>> {
        if composition.items == 0 {
            return Err(FolioError::InputValidation("nothing to compose".into()));
        }
        if let Some(overlay) = overlay {
            let page_ids = composition.assembler.page_ids().to_vec();
            stamp_overlay(composition.assembler.document_mut(), &page_ids, overlay)?;
        }
        let pages = composition.page_count();
        let bytes = composition.assembler.save()?;
        info!(items = composition.items, pages, "Composition complete");
        Ok(bytes)
    }
}

fn item_failure(item: &SourceItem, err: FolioError) -> FolioError {
    FolioError::Composition(format!("item {} ({}): {err}", item.order, item.name))
}
