// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — raster decoding and re-encoding for page composition and
// document reconstruction.

pub mod codec;

pub use codec::{RasterFormat, RasterImage};
