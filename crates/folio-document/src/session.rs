// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion session — the caller-owned state of one conversion: mode, the
// ordered item list, the overlay profile, and configuration.

use std::path::Path;

use folio_core::config::ConversionConfig;
use folio_core::error::{FolioError, Result};
use folio_core::types::{ConversionMode, OverlayProfile, SourceItem, SourceKind};
use tracing::{debug, info, instrument};

use crate::compose::PageComposer;
use crate::docx::DocxBuilder;
use crate::extract::PdfContentExtractor;
use crate::reconstruct::ReconstructionEngine;
use crate::structured::docx_to_pdf;

/// One produced file: a suggested name and its bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ConversionOutput {
    fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Items are kept sorted by `order`, and `order` always equals the item's
/// index in the list.
#[derive(Debug, Clone)]
pub struct ConversionSession {
    mode: ConversionMode,
    items: Vec<SourceItem>,
    overlay: Option<OverlayProfile>,
    config: ConversionConfig,
}

impl ConversionSession {
    pub fn new(mode: ConversionMode, config: ConversionConfig) -> Self {
        Self {
            mode,
            items: Vec::new(),
            overlay: None,
            config,
        }
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn items(&self) -> &[SourceItem] {
        &self.items
    }

    pub fn overlay(&self) -> Option<&OverlayProfile> {
        self.overlay.as_ref()
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    // -- Item list ------------------------------------------------------------

    /// Append an item and return the order it was given.
    pub fn add_item(&mut self, mut item: SourceItem) -> Result<u32> {
        if !self.mode.accepts(item.kind) {
            return Err(FolioError::InputValidation(format!(
                "{:?} items are not accepted in {:?} mode ({})",
                item.kind, self.mode, item.name
            )));
        }
        if item.bytes.is_empty() {
            return Err(FolioError::InputValidation(format!("{} is empty", item.name)));
        }
        if let Some(layout) = &item.layout {
            layout.validate()?;
        }

        item.order = self.items.len() as u32;
        debug!(order = item.order, name = %item.name, kind = ?item.kind, "Item added");
        let order = item.order;
        self.items.push(item);
        Ok(order)
    }

    pub fn remove_item(&mut self, order: u32) -> Result<SourceItem> {
        let index = self.index_of(order)?;
        let removed = self.items.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Move the item at `order` so that it ends up at position `to`
    /// (clamped to the end of the list).
    pub fn move_item(&mut self, order: u32, to: u32) -> Result<()> {
        let index = self.index_of(order)?;
        let item = self.items.remove(index);
        let to = (to as usize).min(self.items.len());
        self.items.insert(to, item);
        self.renumber();
        Ok(())
    }

    fn index_of(&self, order: u32) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.order == order)
            .ok_or_else(|| FolioError::InputValidation(format!("no item at position {order}")))
    }

    fn renumber(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.order = index as u32;
        }
    }

    // -- Overlay --------------------------------------------------------------

    pub fn set_overlay(&mut self, overlay: OverlayProfile) -> Result<()> {
        overlay.validate()?;
        self.overlay = Some(overlay);
        Ok(())
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    // -- Runs -----------------------------------------------------------------

    /// Compose every item into one PDF (`Merge` and `Images` modes).
    #[instrument(skip_all, fields(mode = ?self.mode, items = self.items.len()))]
    pub fn compose(&self) -> Result<ConversionOutput> {
        let name = self.composed_name()?;
        let overlay = self.overlay.clone();
        let bytes = PageComposer::new(&self.config).compose(&self.items, overlay.as_ref())?;
        Ok(ConversionOutput::new(name, bytes))
    }

    /// Rebuild one DOCX per item (`Reconstruct` mode).
    #[instrument(skip_all, fields(items = self.items.len()))]
    pub fn reconstruct(&self) -> Result<Vec<ConversionOutput>> {
        self.require(ConversionMode::Reconstruct)?;
        let overlay = self.overlay.clone();
        let engine = ReconstructionEngine::new(self.config.clone());
        let builder = DocxBuilder::new(self.config.max_image_width_px);

        let mut outputs = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let blocks = engine.reconstruct(&item.bytes, overlay.as_ref())?;
            outputs.push(ConversionOutput::new(renamed(&item.name, "docx"), builder.build(&blocks)?));
        }
        info!(outputs = outputs.len(), "Reconstruction run complete");
        Ok(outputs)
    }

    /// Lay out one PDF per item (`StructuredToPdf` mode).
    #[instrument(skip_all, fields(items = self.items.len()))]
    pub fn structured_to_pdf(&self) -> Result<Vec<ConversionOutput>> {
        self.require(ConversionMode::StructuredToPdf)?;
        let overlay = self.overlay.clone();

        let mut outputs = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let bytes = docx_to_pdf(&item.bytes, overlay.as_ref(), &self.config)?;
            outputs.push(ConversionOutput::new(renamed(&item.name, "pdf"), bytes));
        }
        info!(outputs = outputs.len(), "Structured conversion run complete");
        Ok(outputs)
    }

    // -- Async runs -------------------------------------------------------------
    //
    // Same work and same output as the blocking runs; they only hand control
    // back to the runtime between items (or pages, for reconstruction).

    pub async fn compose_async(&self) -> Result<ConversionOutput> {
        let name = self.composed_name()?;
        let overlay = self.overlay.clone();
        if self.items.is_empty() {
            return Err(FolioError::InputValidation("nothing to compose".into()));
        }

        let composer = PageComposer::new(&self.config);
        let mut composition = composer.begin();
        for item in crate::compose::ordered(&self.items) {
            composer.add(&mut composition, item)?;
            tokio::task::yield_now().await;
        }
        let bytes = composer.finish(composition, overlay.as_ref())?;
        Ok(ConversionOutput::new(name, bytes))
    }

    pub async fn reconstruct_async(&self) -> Result<Vec<ConversionOutput>> {
        self.require(ConversionMode::Reconstruct)?;
        let overlay = self.overlay.clone();
        let engine = ReconstructionEngine::new(self.config.clone());
        let builder = DocxBuilder::new(self.config.max_image_width_px);

        let mut outputs = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let extractor = PdfContentExtractor::from_bytes(&item.bytes)?;
            let mut run = engine.begin(&extractor, overlay.as_ref())?;
            while engine.step(&mut run) {
                tokio::task::yield_now().await;
            }
            let blocks = engine.finish(run);
            outputs.push(ConversionOutput::new(renamed(&item.name, "docx"), builder.build(&blocks)?));
        }
        Ok(outputs)
    }

    pub async fn structured_to_pdf_async(&self) -> Result<Vec<ConversionOutput>> {
        self.require(ConversionMode::StructuredToPdf)?;
        let overlay = self.overlay.clone();

        let mut outputs = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let bytes = docx_to_pdf(&item.bytes, overlay.as_ref(), &self.config)?;
            outputs.push(ConversionOutput::new(renamed(&item.name, "pdf"), bytes));
            tokio::task::yield_now().await;
        }
        Ok(outputs)
    }

    fn require(&self, mode: ConversionMode) -> Result<()> {
        if self.mode != mode {
            return Err(FolioError::InputValidation(format!(
                "session is in {:?} mode, not {mode:?}",
                self.mode
            )));
        }
        if self.items.is_empty() {
            return Err(FolioError::InputValidation("no items to convert".into()));
        }
        Ok(())
    }

    fn composed_name(&self) -> Result<&'static str> {
        match self.mode {
            ConversionMode::Merge => Ok("merged.pdf"),
            ConversionMode::Images => Ok("images.pdf"),
            other => Err(FolioError::InputValidation(format!(
                "{other:?} sessions cannot be composed"
            ))),
        }
    }
}

/// `report.pdf` -> `report.docx`; directories are dropped.
fn renamed(name: &str, extension: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("document");
    format!("{stem}.{extension}")
}

/// Kind implied by a file name's extension, if it is one Folio reads.
pub fn kind_from_name(name: &str) -> Option<SourceKind> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some(SourceKind::Existing),
        "png" | "jpg" | "jpeg" => Some(SourceKind::Raster),
        "docx" => Some(SourceKind::Structured),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::read_paragraphs;
    use crate::image::codec::tests::png_fixture;
    use crate::pdf::PdfReader;
    use crate::pdf::reader::tests::pdf_fixture;
    use crate::reconstruct::Block;
    use folio_core::types::ImageLayout;

    fn merge_session() -> ConversionSession {
        ConversionSession::new(ConversionMode::Merge, ConversionConfig::default())
    }

    fn names(session: &ConversionSession) -> Vec<(u32, &str)> {
        session.items().iter().map(|i| (i.order, i.name.as_str())).collect()
    }

    #[test]
    fn add_item_checks_kind_against_mode() {
        let mut session = ConversionSession::new(ConversionMode::Images, ConversionConfig::default());
        let err = session
            .add_item(SourceItem::existing("a.pdf", pdf_fixture(100.0, 100.0, &[0])))
            .unwrap_err();
        assert!(matches!(err, FolioError::InputValidation(_)));
        assert_eq!(
            session
                .add_item(SourceItem::raster("a.png", png_fixture(4, 4), ImageLayout::default()))
                .unwrap(),
            0
        );
    }

    #[test]
    fn add_item_rejects_bad_layout_and_empty_bytes() {
        let mut session = merge_session();
        let layout = ImageLayout {
            scale: 0.0,
            ..Default::default()
        };
        assert!(session.add_item(SourceItem::raster("a.png", png_fixture(4, 4), layout)).is_err());
        assert!(session.add_item(SourceItem::existing("empty.pdf", Vec::new())).is_err());
        assert!(session.items().is_empty());
    }

    #[test]
    fn remove_and_move_renumber_densely() {
        let mut session = merge_session();
        for name in ["a", "b", "c", "d"] {
            session
                .add_item(SourceItem::existing(name, pdf_fixture(100.0, 100.0, &[0])))
                .unwrap();
        }

        session.remove_item(1).unwrap();
        assert_eq!(names(&session), vec![(0, "a"), (1, "c"), (2, "d")]);

        session.move_item(2, 0).unwrap();
        assert_eq!(names(&session), vec![(0, "d"), (1, "a"), (2, "c")]);

        session.move_item(0, 99).unwrap();
        assert_eq!(names(&session), vec![(0, "a"), (1, "c"), (2, "d")]);

        assert!(session.remove_item(7).is_err());
    }

    #[test]
    fn overlay_is_validated_on_set() {
        let mut session = merge_session();
        let mut overlay = OverlayProfile::new(png_fixture(4, 4));
        overlay.width_points = -1.0;
        assert!(session.set_overlay(overlay).is_err());
        assert!(session.overlay().is_none());

        session.set_overlay(OverlayProfile::new(png_fixture(4, 4))).unwrap();
        assert!(session.overlay().is_some());
        session.clear_overlay();
        assert!(session.overlay().is_none());
    }

    #[test]
    fn compose_follows_session_order() {
        let mut session = merge_session();
        session
            .add_item(SourceItem::existing("wide", pdf_fixture(300.0, 100.0, &[0])))
            .unwrap();
        session
            .add_item(SourceItem::existing("tall", pdf_fixture(100.0, 300.0, &[0, 0])))
            .unwrap();
        session.move_item(1, 0).unwrap();

        let output = session.compose().unwrap();
        assert_eq!(output.name, "merged.pdf");
        let reader = PdfReader::from_bytes(&output.bytes).unwrap();
        assert_eq!(reader.page_count(), 3);
        assert_eq!(reader.page_geometry(0).unwrap().width_pt, 100.0);
        assert_eq!(reader.page_geometry(2).unwrap().width_pt, 300.0);
    }

    #[test]
    fn runs_require_their_mode() {
        let mut session = merge_session();
        session
            .add_item(SourceItem::existing("a.pdf", pdf_fixture(100.0, 100.0, &[0])))
            .unwrap();
        assert!(session.reconstruct().is_err());
        assert!(session.structured_to_pdf().is_err());

        let empty = ConversionSession::new(ConversionMode::Reconstruct, ConversionConfig::default());
        assert!(matches!(empty.reconstruct(), Err(FolioError::InputValidation(_))));
        let reconstruct = ConversionSession::new(ConversionMode::Reconstruct, ConversionConfig::default());
        assert!(reconstruct.compose().is_err());
    }

    #[test]
    fn reconstruct_produces_one_docx_per_item() {
        let mut session = ConversionSession::new(ConversionMode::Reconstruct, ConversionConfig::default());
        session
            .add_item(SourceItem::existing("scans/report.pdf", pdf_fixture(612.0, 792.0, &[0, 0])))
            .unwrap();

        let outputs = session.reconstruct().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "report.docx");
        let paragraphs = read_paragraphs(&outputs[0].bytes).unwrap();
        assert_eq!(paragraphs, vec!["page 1", "", "page 2"]);
    }

    #[test]
    fn structured_to_pdf_names_outputs() {
        let mut session =
            ConversionSession::new(ConversionMode::StructuredToPdf, ConversionConfig::default());
        let docx = DocxBuilder::new(500).build(&[Block::Text("hello".into())]).unwrap();
        session.add_item(SourceItem::structured("letter.docx", docx)).unwrap();

        let outputs = session.structured_to_pdf().unwrap();
        assert_eq!(outputs[0].name, "letter.pdf");
        assert_eq!(PdfReader::from_bytes(&outputs[0].bytes).unwrap().page_count(), 1);
    }

    #[test]
    fn kinds_from_file_names() {
        assert_eq!(kind_from_name("a.PDF"), Some(SourceKind::Existing));
        assert_eq!(kind_from_name("photo.jpeg"), Some(SourceKind::Raster));
        assert_eq!(kind_from_name("letter.docx"), Some(SourceKind::Structured));
        assert_eq!(kind_from_name("notes.txt"), None);
        assert_eq!(kind_from_name("README"), None);
    }

    #[tokio::test]
    async fn async_compose_matches_blocking_compose() {
        let mut session = merge_session();
        session
            .add_item(SourceItem::existing("a.pdf", pdf_fixture(612.0, 792.0, &[0, 90])))
            .unwrap();
        session
            .add_item(SourceItem::raster("b.png", png_fixture(30, 60), ImageLayout::default()))
            .unwrap();
        session.set_overlay(OverlayProfile::new(png_fixture(10, 5))).unwrap();

        let blocking = PdfReader::from_bytes(&session.compose().unwrap().bytes).unwrap();
        let async_output = session.compose_async().await.unwrap();
        let yielding = PdfReader::from_bytes(&async_output.bytes).unwrap();
        assert_eq!(blocking.page_count(), yielding.page_count());
        for index in 0..blocking.page_count() {
            assert_eq!(
                blocking.page_geometry(index).unwrap(),
                yielding.page_geometry(index).unwrap()
            );
        }
    }

    #[tokio::test]
    async fn async_reconstruct_matches_blocking_reconstruct() {
        let mut session = ConversionSession::new(ConversionMode::Reconstruct, ConversionConfig::default());
        session
            .add_item(SourceItem::existing("a.pdf", pdf_fixture(612.0, 792.0, &[0, 0, 0])))
            .unwrap();
        session.set_overlay(OverlayProfile::new(png_fixture(10, 5))).unwrap();

        let blocking = session.reconstruct().unwrap();
        let yielding = session.reconstruct_async().await.unwrap();
        assert_eq!(blocking.len(), yielding.len());
        assert_eq!(blocking[0].name, yielding[0].name);
        // Archive timestamps may differ; compare the document text.
        assert_eq!(
            read_paragraphs(&blocking[0].bytes).unwrap(),
            read_paragraphs(&yielding[0].bytes).unwrap()
        );
    }

    #[tokio::test]
    async fn async_structured_to_pdf_runs() {
        let mut session =
            ConversionSession::new(ConversionMode::StructuredToPdf, ConversionConfig::default());
        let docx = DocxBuilder::new(500).build(&[Block::Text("x".into())]).unwrap();
        session.add_item(SourceItem::structured("x.docx", docx)).unwrap();
        let outputs = session.structured_to_pdf_async().await.unwrap();
        assert_eq!(outputs.len(), 1);
    }
}
