// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster codec — decode PNG/JPEG input, wrap raw RGBA buffers, and encode
// back to PNG for embedding. Operates on in-memory images using the `image`
// crate.

use image::{DynamicImage, ImageFormat, RgbaImage};
use folio_core::error::{FolioError, Result};
use tracing::{debug, instrument};

/// Encoded formats accepted as raster input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    /// Identify the format from magic bytes. Only PNG and JPEG are accepted.
    pub fn detect(data: &[u8]) -> Result<Self> {
        match image::guess_format(data) {
            Ok(ImageFormat::Png) => Ok(Self::Png),
            Ok(ImageFormat::Jpeg) => Ok(Self::Jpeg),
            Ok(other) => Err(FolioError::UnsupportedImageFormat(format!("{other:?}"))),
            Err(_) => Err(FolioError::UnsupportedImageFormat(
                "unrecognised image signature".into(),
            )),
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// A decoded raster image.
pub struct RasterImage {
    image: DynamicImage,
}

impl RasterImage {
    // -- Construction ---------------------------------------------------------

    /// Decode PNG or JPEG bytes.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = RasterFormat::detect(data)?;
        let img = image::load_from_memory_with_format(data, format.image_format()).map_err(
            |err| FolioError::SourceParse(format!("failed to decode {format:?} image: {err}")),
        )?;
        debug!(
            width = img.width(),
            height = img.height(),
            ?format,
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap a raw RGBA buffer (4 bytes per pixel, row-major).
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let buffer = RgbaImage::from_raw(width, height, pixels).ok_or(
            FolioError::InvalidDimensions {
                width: width as f64,
                height: height as f64,
            },
        )?;
        Ok(Self {
            image: DynamicImage::ImageRgba8(buffer),
        })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether any pixel is less than fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.image.color().has_alpha() && self.image.to_rgba8().pixels().any(|p| p[3] < 255)
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Packed 8-bit RGB samples, alpha discarded.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.image.to_rgb8().into_raw()
    }

    /// Packed 8-bit RGBA samples.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.image.to_rgba8().into_raw()
    }

    /// Packed 8-bit alpha samples (255 for opaque formats).
    pub fn to_alpha_bytes(&self) -> Vec<u8> {
        self.image.to_rgba8().pixels().map(|p| p[3]).collect()
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| FolioError::OutputEncoding(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }
}
