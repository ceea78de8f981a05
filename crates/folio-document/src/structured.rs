// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structured-to-paginated conversion: lay out a DOCX's paragraphs as PDF
// pages, then apply the overlay like any composed document.

use folio_core::config::ConversionConfig;
use folio_core::error::Result;
use folio_core::types::OverlayProfile;
use tracing::{info, instrument};

use crate::docx::read_paragraphs;
use crate::pdf::{PdfAssembler, PdfReader, PdfWriter, stamp_overlay};

/// Convert one DOCX package to PDF bytes.
///
/// Only paragraph text survives; styles, tables and embedded images are not
/// laid out.
#[instrument(skip_all, fields(bytes_len = source.len(), overlay = overlay.is_some()))]
pub fn docx_to_pdf(
    source: &[u8],
    overlay: Option<&OverlayProfile>,
    config: &ConversionConfig,
) -> Result<Vec<u8>> {
    if let Some(overlay) = overlay {
        overlay.validate()?;
    }
    let paragraphs = read_paragraphs(source)?;
    let laid_out = PdfWriter::from_config(config).create_from_paragraphs(&paragraphs)?;

    let Some(overlay) = overlay else {
        info!(paragraphs = paragraphs.len(), "DOCX laid out");
        return Ok(laid_out);
    };

    let reader = PdfReader::from_bytes(&laid_out)?;
    let mut assembler = PdfAssembler::new(&config.title);
    assembler.append_document(&reader)?;
    let page_ids = assembler.page_ids().to_vec();
    stamp_overlay(assembler.document_mut(), &page_ids, overlay)?;

    info!(paragraphs = paragraphs.len(), pages = page_ids.len(), "DOCX laid out and stamped");
    assembler.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::DocxBuilder;
    use crate::extract::{ContentExtractor, PdfContentExtractor};
    use crate::image::codec::tests::png_fixture;
    use crate::pdf::overlay::tests::overlay_cm;
    use crate::reconstruct::Block;
    use folio_core::error::FolioError;
    use lopdf::Document;

    fn docx(lines: &[&str]) -> Vec<u8> {
        let blocks: Vec<Block> = lines.iter().map(|line| Block::Text(line.to_string())).collect();
        DocxBuilder::new(500).build(&blocks).unwrap()
    }

    #[test]
    fn paragraphs_become_page_text() {
        let pdf = docx_to_pdf(&docx(&["Dear reader,", "Kind regards"]), None, &ConversionConfig::default())
            .unwrap();
        let extractor = PdfContentExtractor::from_bytes(&pdf).unwrap();
        assert_eq!(extractor.page_count(), 1);
        let texts: Vec<String> = extractor
            .extract_page(0)
            .unwrap()
            .runs
            .into_iter()
            .map(|run| run.text)
            .collect();
        assert_eq!(texts, vec!["Dear reader,", "Kind regards"]);
    }

    #[test]
    fn overlay_is_stamped_on_laid_out_pages() {
        let overlay = OverlayProfile::new(png_fixture(30, 10));
        let pdf = docx_to_pdf(&docx(&["signed"]), Some(&overlay), &ConversionConfig::default()).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let cm = overlay_cm(&doc, page_id).unwrap();
        assert!((cm[0] - 150.0).abs() < 1e-3);
        assert!((cm[3] - 50.0).abs() < 1e-3);
    }

    #[test]
    fn bad_inputs_fail_before_layout() {
        let config = ConversionConfig::default();
        assert!(matches!(
            docx_to_pdf(b"not a zip", None, &config),
            Err(FolioError::SourceParse(_))
        ));
        let mut overlay = OverlayProfile::new(png_fixture(4, 4));
        overlay.x_percent = 1.5;
        assert!(matches!(
            docx_to_pdf(&docx(&["x"]), Some(&overlay), &config),
            Err(FolioError::InputValidation(_))
        ));
    }
}
