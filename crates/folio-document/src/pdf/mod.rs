// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, page copying, assembling, overlay stamping, and
// creating new pages.

pub mod assembler;
pub mod objects;
pub mod overlay;
pub mod reader;
pub mod writer;
pub mod xobject;

pub use assembler::PdfAssembler;
pub use overlay::stamp_overlay;
pub use reader::{PageCopier, PdfReader};
pub use writer::PdfWriter;
