// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw image samples to RGBA.

use folio_core::error::{FolioError, Result};
use tracing::debug;

use crate::extract::{ColorspaceTag, RawImageObject};
use crate::image::RasterImage;

/// A decoded image ready for the structured-document builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub width: u32,
    pub height: u32,
    /// 4 bytes per pixel, row-major.
    pub rgba: Vec<u8>,
}

impl ImageBlock {
    /// PNG encoding of the pixels.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        RasterImage::from_rgba(self.width, self.height, self.rgba.clone())?.to_png_bytes()
    }
}

/// Expand `raw` to RGBA.
///
/// Returns `Ok(None)` for colorspaces this pipeline does not handle, and an
/// `Extraction` error when the sample count does not match the declared
/// dimensions.
pub fn decode_image(page: usize, raw: &RawImageObject) -> Result<Option<ImageBlock>> {
    let channels = match &raw.colorspace {
        ColorspaceTag::Gray => 1,
        ColorspaceTag::Rgb => 3,
        ColorspaceTag::Rgba => 4,
        ColorspaceTag::Other(description) => {
            debug!(page, image = %raw.name, colorspace = %description, "Unsupported colorspace, image dropped");
            return Ok(None);
        }
    };

    let expected = RawImageObject::sample_len(raw.width, raw.height, channels);
    if expected.is_none_or(|len| len == 0 || raw.data.len() != len) {
        return Err(FolioError::Extraction {
            page,
            detail: format!(
                "image {} is {}x{} with {} channel(s) but has {} bytes",
                raw.name,
                raw.width,
                raw.height,
                channels,
                raw.data.len()
            ),
        });
    }

    let rgba = match channels {
        1 => raw.data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        3 => raw
            .data
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        _ => raw.data.clone(),
    };

    Ok(Some(ImageBlock {
        width: raw.width,
        height: raw.height,
        rgba,
    }))
}
