// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How positioned text runs are grouped into lines during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LineClustering {
    /// Runs join a line only when their baselines round to the same integer.
    #[default]
    Exact,
    /// Runs join a line when their baselines lie within `band_pt` of the
    /// line's first (highest) run.
    Tolerance { band_pt: f64 },
}

/// Settings shared by every conversion in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Canvas for pages created from images or text.
    pub paper_size: crate::PaperSize,
    /// Margin around placed images, in points.
    pub margin_pt: f64,
    pub line_clustering: LineClustering,
    /// Images in reconstructed documents are shrunk to at most this width.
    pub max_image_width_px: u32,
    /// Title written into generated PDF metadata.
    pub title: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            paper_size: crate::PaperSize::A4,
            margin_pt: 20.0,
            line_clustering: LineClustering::Exact,
            max_image_width_px: 500,
            title: "Folio Document".into(),
        }
    }
}

impl ConversionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config file. Missing keys fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Page width and height in points.
    pub fn page_dimensions(&self) -> (f64, f64) {
        self.paper_size.dimensions_pt()
    }
}
