// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout geometry — anchored placement and fit-to-box scaling for images
// placed on a fixed page canvas. All values are PDF points, origin bottom-left.

use folio_core::error::{FolioError, Result};
use folio_core::types::{Anchor, HorizontalAlign, Position, Size, VerticalAlign};

/// Position a `content_w` x `content_h` box on the page according to `anchor`.
///
/// The caller must ensure the content fits inside the page (see
/// [`compute_fitted_scale`]); no clamping is done here.
pub fn compute_anchored_rect(
    page_w: f64,
    page_h: f64,
    margin: f64,
    content_w: f64,
    content_h: f64,
    anchor: Anchor,
) -> Position {
    let x = match anchor.horizontal {
        HorizontalAlign::Left => margin,
        HorizontalAlign::Right => page_w - margin - content_w,
        HorizontalAlign::Center => (page_w - content_w) / 2.0,
    };
    let y = match anchor.vertical {
        VerticalAlign::Top => page_h - margin - content_h,
        VerticalAlign::Bottom => margin,
        VerticalAlign::Center => (page_h - content_h) / 2.0,
    };
    Position { x, y }
}

/// Scale a `natural_w` x `natural_h` image to fit inside the page margins,
/// then shrink it further by `user_scale`. Aspect ratio is preserved.
pub fn compute_fitted_scale(
    page_w: f64,
    page_h: f64,
    margin: f64,
    natural_w: f64,
    natural_h: f64,
    user_scale: f64,
) -> Result<Size> {
    if !(natural_w > 0.0 && natural_h > 0.0) || !natural_w.is_finite() || !natural_h.is_finite()
    {
        return Err(FolioError::InvalidDimensions {
            width: natural_w,
            height: natural_h,
        });
    }

    let max_w = page_w - 2.0 * margin;
    let max_h = page_h - 2.0 * margin;
    let base_scale = (max_w / natural_w).min(max_h / natural_h);
    let final_scale = base_scale * user_scale;

    Ok(Size {
        width: natural_w * final_scale,
        height: natural_h * final_scale,
    })
}
