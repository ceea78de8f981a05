// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX module — building WordprocessingML packages from reconstructed blocks
// and reading paragraph text back out of them.

pub mod builder;
pub mod reader;

pub use builder::DocxBuilder;
pub use reader::read_paragraphs;
