// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Conversion engine for Folio.
//
// Composes PDFs and raster images into one PDF, stamps rotation-aware
// signature overlays, rebuilds DOCX packages from PDF text and images, and
// lays DOCX paragraphs out as PDF pages.

pub mod compose;
pub mod docx;
pub mod extract;
pub mod geometry;
pub mod image;
pub mod pdf;
pub mod reconstruct;
pub mod rotation;
pub mod session;
pub mod structured;

// Re-export the primary entry points so callers can use `folio_document::ConversionSession` etc.
pub use compose::PageComposer;
pub use docx::DocxBuilder;
pub use extract::{ContentExtractor, PdfContentExtractor};
pub use pdf::{PdfAssembler, PdfReader, PdfWriter};
pub use reconstruct::{Block, Reconstruction, ReconstructionEngine};
pub use session::{ConversionOutput, ConversionSession};
pub use structured::docx_to_pdf;
