// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotation-aware overlay placement.
//
// Overlay profiles store a position relative to the page as the reader sees
// it. A page's /Rotate entry changes how its physical coordinate space maps to
// that view, so the axes swap and/or invert per quarter turn.

use folio_core::error::{FolioError, Result};
use folio_core::types::{PageGeometry, Position};

/// Normalise a rotation to one of 0, 90, 180, 270.
///
/// Negative and over-full turns are folded (`-90` becomes `270`). Anything
/// that is not a quarter turn is rejected.
pub fn normalize_rotation(degrees: i64) -> Result<i64> {
    if degrees % 90 != 0 {
        return Err(FolioError::UnsupportedRotation(degrees));
    }
    Ok(degrees.rem_euclid(360))
}

/// Convert a rotation-independent overlay position into absolute page
/// coordinates for a page with the given physical rotation.
pub fn place_overlay(
    rotation_deg: i64,
    page_w: f64,
    page_h: f64,
    x_percent: f64,
    y_percent: f64,
) -> Result<Position> {
    let (x, y) = match normalize_rotation(rotation_deg)? {
        0 => (page_w * x_percent, page_h * y_percent),
        90 => (page_w * y_percent, page_h * (1.0 - x_percent)),
        180 => (page_w * (1.0 - x_percent), page_h * (1.0 - y_percent)),
        270 => (page_w * (1.0 - y_percent), page_h * x_percent),
        other => return Err(FolioError::UnsupportedRotation(other)),
    };
    Ok(Position { x, y })
}

/// [`place_overlay`] for a page whose geometry has already been read.
pub fn place_on_page(page: &PageGeometry, x_percent: f64, y_percent: f64) -> Result<Position> {
    place_overlay(
        page.rotation_deg,
        page.width_pt,
        page.height_pt,
        x_percent,
        y_percent,
    )
}

/// Inverse of [`place_overlay`]: recover the reader-relative
/// `(x_percent, y_percent)` from absolute page coordinates.
pub fn visual_position(
    rotation_deg: i64,
    page_w: f64,
    page_h: f64,
    position: Position,
) -> Result<(f64, f64)> {
    let fx = position.x / page_w;
    let fy = position.y / page_h;
    match normalize_rotation(rotation_deg)? {
        0 => Ok((fx, fy)),
        90 => Ok((1.0 - fy, fx)),
        180 => Ok((1.0 - fx, 1.0 - fy)),
        270 => Ok((fy, 1.0 - fx)),
        other => Err(FolioError::UnsupportedRotation(other)),
    }
}
