// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconstruction — turn a paginated source into an ordered block sequence
// (text lines, images, page breaks, overlay) for a structured-document
// builder.

pub mod decode;
pub mod lines;

pub use decode::{ImageBlock, decode_image};
pub use lines::{TextLine, cluster_lines};

use folio_core::config::ConversionConfig;
use folio_core::error::Result;
use folio_core::types::{OverlayProfile, OverlayScope, PaperSize};
use tracing::{debug, info, instrument, warn};

use crate::extract::{ContentExtractor, PdfContentExtractor};
use crate::image::RasterImage;

/// A signature image floating at an absolute offset from the page's
/// top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBlock {
    /// PNG-encoded image.
    pub png: Vec<u8>,
    pub offset_x_pt: f64,
    /// Distance from the top edge of the page to the image's top edge.
    pub offset_y_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
}

impl OverlayBlock {
    /// Position `overlay` on an upright A4 page. The page's own rotation is
    /// not consulted: the reconstructed page always faces the reader.
    pub fn from_profile(overlay: &OverlayProfile) -> Result<Self> {
        overlay.validate()?;
        let image = RasterImage::from_bytes(&overlay.image)?;
        let (page_w, page_h) = PaperSize::A4.dimensions_pt();

        let width_pt = overlay.width_points;
        let height_pt = width_pt * image.height() as f64 / image.width() as f64;
        let offset_x_pt = page_w * overlay.x_percent;
        // y_percent is measured bottom-up; the anchor offset is top-down.
        let offset_y_pt = page_h * (1.0 - overlay.y_percent);

        Ok(Self {
            png: image.to_png_bytes()?,
            offset_x_pt,
            offset_y_pt,
            width_pt,
            height_pt,
        })
    }
}

/// An overlay block together with the pages that receive it.
struct ScopedOverlay {
    block: OverlayBlock,
    scope: OverlayScope,
    page_count: usize,
}

impl ScopedOverlay {
    fn new(profile: &OverlayProfile, page_count: usize) -> Result<Self> {
        Ok(Self {
            block: OverlayBlock::from_profile(profile)?,
            scope: profile.scope,
            page_count,
        })
    }

    fn for_page(&self, index: usize) -> Option<&OverlayBlock> {
        self.scope
            .includes(index, self.page_count)
            .then_some(&self.block)
    }
}

/// A reconstruction in progress, advanced one page per
/// [`ReconstructionEngine::step`].
pub struct Reconstruction<'a, E: ContentExtractor + ?Sized> {
    extractor: &'a E,
    overlay: Option<ScopedOverlay>,
    next_page: usize,
    blocks: Vec<Block>,
}

impl<E: ContentExtractor + ?Sized> Reconstruction<'_, E> {
    pub fn page_count(&self) -> usize {
        self.extractor.page_count()
    }

    pub fn is_done(&self) -> bool {
        self.next_page >= self.page_count()
    }
}

/// One unit of reconstructed output.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(String),
    Image(ImageBlock),
    PageBreak,
    Overlay(OverlayBlock),
}

/// Drives extraction, clustering, and image decoding page by page.
pub struct ReconstructionEngine {
    config: ConversionConfig,
}

impl ReconstructionEngine {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// Reconstruct a PDF held in memory.
    ///
    /// Only an unparseable source or an unusable overlay fails the call;
    /// problems on individual pages or images are logged and skipped.
    #[instrument(skip_all, fields(bytes_len = source.len(), overlay = overlay.is_some()))]
    pub fn reconstruct(&self, source: &[u8], overlay: Option<&OverlayProfile>) -> Result<Vec<Block>> {
        let extractor = PdfContentExtractor::from_bytes(source)?;
        self.reconstruct_from(&extractor, overlay)
    }

    /// Reconstruct from any content source.
    pub fn reconstruct_from(
        &self,
        extractor: &dyn ContentExtractor,
        overlay: Option<&OverlayProfile>,
    ) -> Result<Vec<Block>> {
        let mut run = self.begin(extractor, overlay)?;
        while self.step(&mut run) {}
        Ok(self.finish(run))
    }

    /// Start a page-at-a-time reconstruction of `extractor`.
    ///
    /// Fails only when the overlay cannot be prepared.
    pub fn begin<'a, E>(&self, extractor: &'a E, overlay: Option<&OverlayProfile>) -> Result<Reconstruction<'a, E>>
    where
        E: ContentExtractor + ?Sized,
    {
        let page_count = extractor.page_count();
        let overlay = overlay
            .map(|profile| ScopedOverlay::new(profile, page_count))
            .transpose()?;
        Ok(Reconstruction {
            extractor,
            overlay,
            next_page: 0,
            blocks: Vec::new(),
        })
    }

    /// Reconstruct the next page. Returns `false` once every page is done.
    pub fn step<E>(&self, run: &mut Reconstruction<'_, E>) -> bool
    where
        E: ContentExtractor + ?Sized,
    {
        if run.is_done() {
            return false;
        }
        let index = run.next_page;
        let page_overlay = run.overlay.as_ref().and_then(|o| o.for_page(index));
        self.reconstruct_page(run.extractor, index, page_overlay, &mut run.blocks);
        run.next_page += 1;
        true
    }

    /// The blocks of a run. Pages not yet stepped contribute nothing.
    pub fn finish<E>(&self, run: Reconstruction<'_, E>) -> Vec<Block>
    where
        E: ContentExtractor + ?Sized,
    {
        info!(
            pages = run.next_page,
            blocks = run.blocks.len(),
            "Reconstruction complete"
        );
        run.blocks
    }

    /// Append the blocks for page `index` to `blocks`. Never fails: a page
    /// that cannot be extracted contributes no text or images.
    fn reconstruct_page<E>(
        &self,
        extractor: &E,
        index: usize,
        overlay: Option<&OverlayBlock>,
        blocks: &mut Vec<Block>,
    ) where
        E: ContentExtractor + ?Sized,
    {
        let page = index + 1;
        match extractor.extract_page(index) {
            Ok(content) => {
                let lines = cluster_lines(&content.runs, self.config.line_clustering);
                let line_count = lines.len();
                blocks.extend(lines.iter().map(|line| Block::Text(line.text())));

                let mut decoded = 0;
                for raw in &content.images {
                    match decode_image(page, raw) {
                        Ok(Some(image)) => {
                            blocks.push(Block::Image(image));
                            decoded += 1;
                        }
                        Ok(None) => {}
                        Err(err) => warn!(page, image = %raw.name, %err, "Image decode failed"),
                    }
                }
                debug!(page, lines = line_count, images = decoded, "Page reconstructed");
            }
            Err(err) => warn!(page, %err, "Page extraction failed, continuing"),
        }

        if let Some(overlay) = overlay {
            blocks.push(Block::Overlay(overlay.clone()));
        }
        if page < extractor.page_count() {
            blocks.push(Block::PageBreak);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::{ColorspaceTag, GlyphRun, PageContent, RawImageObject};
    use crate::image::codec::tests::png_fixture;
    use crate::pdf::reader::tests::pdf_fixture;
    use folio_core::error::FolioError;
    use lopdf::{Dictionary, Document, Object, Stream, dictionary};

    /// Scripted extractor: one entry per page.
    pub(crate) struct FakeExtractor {
        pub(crate) pages: Vec<Result<PageContent>>,
    }

    impl ContentExtractor for FakeExtractor {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn extract_page(&self, index: usize) -> Result<PageContent> {
            match &self.pages[index] {
                Ok(content) => Ok(content.clone()),
                Err(err) => Err(FolioError::Extraction {
                    page: index + 1,
                    detail: err.to_string(),
                }),
            }
        }
    }

    fn rgb_image(width: u32, height: u32, bytes: usize) -> RawImageObject {
        RawImageObject {
            name: "Im1".into(),
            width,
            height,
            colorspace: ColorspaceTag::Rgb,
            data: vec![7; bytes],
        }
    }

    fn page(texts: &[(&str, f64)], images: Vec<RawImageObject>) -> Result<PageContent> {
        Ok(PageContent {
            runs: texts
                .iter()
                .map(|(text, y)| GlyphRun::new(*text, 0.0, *y, 12.0))
                .collect(),
            images,
        })
    }

    fn engine() -> ReconstructionEngine {
        ReconstructionEngine::new(ConversionConfig::default())
    }

    #[test]
    fn bad_image_on_page_two_does_not_stop_page_three() {
        let extractor = FakeExtractor {
            pages: vec![
                page(&[("one", 700.0)], vec![rgb_image(2, 2, 12)]),
                page(&[("two", 700.0)], vec![rgb_image(2, 2, 5)]),
                page(&[("three", 700.0)], vec![]),
            ],
        };
        let blocks = engine().reconstruct_from(&extractor, None).unwrap();

        let texts: Vec<&str> = blocks
            .iter()
            .filter_map(|block| match block {
                Block::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        let images = blocks.iter().filter(|b| matches!(b, Block::Image(_))).count();
        assert_eq!(images, 1);
    }

    #[test]
    fn failed_page_still_gets_its_page_break() {
        let extractor = FakeExtractor {
            pages: vec![
                Err(FolioError::SourceParse("broken".into())),
                page(&[("after", 100.0)], vec![]),
            ],
        };
        let blocks = engine().reconstruct_from(&extractor, None).unwrap();
        assert_eq!(blocks, vec![Block::PageBreak, Block::Text("after".into())]);
    }

    #[test]
    fn block_order_is_lines_then_images_then_break() {
        let extractor = FakeExtractor {
            pages: vec![
                page(&[("low", 100.0), ("high", 700.0)], vec![rgb_image(1, 1, 3)]),
                page(&[], vec![]),
            ],
        };
        let blocks = engine().reconstruct_from(&extractor, None).unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0], Block::Text("high".into()));
        assert_eq!(blocks[1], Block::Text("low".into()));
        assert!(matches!(blocks[2], Block::Image(_)));
        assert_eq!(blocks[3], Block::PageBreak);
    }

    #[test]
    fn overlay_follows_scope() {
        let extractor = FakeExtractor {
            pages: vec![page(&[], vec![]), page(&[], vec![]), page(&[], vec![])],
        };
        let mut overlay = OverlayProfile::new(png_fixture(100, 50));
        overlay.scope = OverlayScope::First;

        let blocks = engine().reconstruct_from(&extractor, Some(&overlay)).unwrap();
        let positions: Vec<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| matches!(b, Block::Overlay(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions, vec![0]);
    }

    #[test]
    fn overlay_offsets_come_from_percentages() {
        let mut overlay = OverlayProfile::new(png_fixture(100, 50));
        overlay.x_percent = 0.5;
        overlay.y_percent = 0.1;
        overlay.width_points = 200.0;

        let block = OverlayBlock::from_profile(&overlay).unwrap();
        assert!((block.offset_x_pt - 297.64).abs() < 1e-6);
        assert_eq!(block.height_pt, 100.0);
        assert!((block.offset_y_pt - 841.89 * 0.9).abs() < 1e-6);

        overlay.y_percent = 0.0;
        let block = OverlayBlock::from_profile(&overlay).unwrap();
        assert!((block.offset_y_pt - 841.89).abs() < 1e-6);
    }

    #[test]
    fn reconstructs_a_real_pdf() {
        let blocks = engine()
            .reconstruct(&pdf_fixture(612.0, 792.0, &[0, 90]), None)
            .unwrap();
        assert_eq!(
            blocks,
            vec![
                Block::Text("page 1".into()),
                Block::PageBreak,
                Block::Text("page 2".into()),
            ]
        );
    }

    fn rgb_xobject(width: i64, height: i64, data: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            data,
        )
    }

    /// Three pages of text; page 2 draws images whose declared sizes cannot
    /// match their data.
    fn pdf_with_bad_images_on_page_two() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 70_000i64,
                "Height" => 70_000i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8i64,
            },
            vec![0; 4],
        ));
        let mut masked = rgb_xobject(70_000, 70_000, vec![0; 3]);
        masked.dict.set("SMask", mask_id);

        let pages = vec![
            ("one", vec![rgb_xobject(1, 1, vec![9, 9, 9])]),
            ("two", vec![masked, rgb_xobject(i64::MAX, i64::MAX, vec![0; 3])]),
            ("three", Vec::new()),
        ];
        let mut kids = Vec::new();
        for (text, images) in pages {
            let mut xobjects = Dictionary::new();
            let mut content = format!("BT /F1 12 Tf 72 700 Td ({text}) Tj ET");
            for (n, image) in images.into_iter().enumerate() {
                let name = format!("Im{n}");
                xobjects.set(name.as_bytes().to_vec(), doc.add_object(image));
                content.push_str(&format!(" q 10 0 0 10 0 0 cm /{name} Do Q"));
            }
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! { "XObject" => xobjects },
            });
            kids.push(Object::from(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 3i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn malformed_images_in_a_real_pdf_are_skipped() {
        let blocks = engine()
            .reconstruct(&pdf_with_bad_images_on_page_two(), None)
            .unwrap();

        assert_eq!(blocks.len(), 6);
        assert_eq!(blocks[0], Block::Text("one".into()));
        assert!(matches!(&blocks[1], Block::Image(image) if image.width == 1));
        assert_eq!(
            blocks[2..],
            [
                Block::PageBreak,
                Block::Text("two".into()),
                Block::PageBreak,
                Block::Text("three".into()),
            ]
        );
    }

    #[test]
    fn stepping_matches_a_whole_run() {
        let extractor = FakeExtractor {
            pages: vec![page(&[("a", 700.0)], vec![]), page(&[("b", 700.0)], vec![])],
        };
        let engine = engine();

        let mut run = engine.begin(&extractor, None).unwrap();
        assert_eq!(run.page_count(), 2);
        assert!(engine.step(&mut run));
        assert!(!run.is_done());
        assert!(engine.step(&mut run));
        assert!(run.is_done());
        assert!(!engine.step(&mut run));

        assert_eq!(
            engine.finish(run),
            engine.reconstruct_from(&extractor, None).unwrap()
        );
    }

    #[test]
    fn unparseable_source_fails() {
        assert!(matches!(
            engine().reconstruct(b"garbage", None),
            Err(FolioError::SourceParse(_))
        ));
    }
}
