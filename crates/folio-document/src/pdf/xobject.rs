// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObjects — embed a decoded raster image into a lopdf document as a
// Flate-compressed DeviceRGB stream, with a DeviceGray soft mask when the
// image carries transparency.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use folio_core::error::{FolioError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::image::RasterImage;

/// Add `image` to `doc` as an image XObject and return its object ID.
pub fn embed_image(doc: &mut Document, image: &RasterImage) -> Result<ObjectId> {
    let (width, height) = (image.width() as i64, image.height() as i64);

    let mut dict = image_dictionary(width, height, "DeviceRGB");
    if image.has_transparency() {
        let mask_dict = image_dictionary(width, height, "DeviceGray");
        let mask = Stream::new(mask_dict, deflate(&image.to_alpha_bytes())?);
        let mask_id = doc.add_object(mask);
        dict.set("SMask", Object::Reference(mask_id));
        debug!(?mask_id, "Soft mask attached to image");
    }

    let stream = Stream::new(dict, deflate(&image.to_rgb_bytes())?);
    Ok(doc.add_object(stream))
}

fn image_dictionary(width: i64, height: i64, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", width);
    dict.set("Height", height);
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", 8i64);
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    dict
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|err| FolioError::OutputEncoding(format!("image compression failed: {err}")))?;
    encoder
        .finish()
        .map_err(|err| FolioError::OutputEncoding(format!("image compression failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::codec::tests::{png_fixture, transparent_png_fixture};

    #[test]
    fn opaque_image_has_no_soft_mask() {
        let mut doc = Document::with_version("1.5");
        let image = RasterImage::from_bytes(&png_fixture(6, 3)).unwrap();
        let id = embed_image(&mut doc, &image).unwrap();

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 6);
        assert!(!stream.dict.has(b"SMask"));
        assert_eq!(stream.decompressed_content().unwrap().len(), 6 * 3 * 3);
    }

    #[test]
    fn transparent_image_carries_soft_mask() {
        let mut doc = Document::with_version("1.5");
        let image = RasterImage::from_bytes(&transparent_png_fixture(4, 2)).unwrap();
        let id = embed_image(&mut doc, &image).unwrap();

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        let mask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(mask.decompressed_content().unwrap(), vec![0, 0, 255, 255, 0, 0, 255, 255]);
    }
}
