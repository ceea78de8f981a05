// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio conversion engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FolioError;

/// Millimetres per PostScript point.
const MM_PER_PT: f64 = 25.4 / 72.0;

/// What a source item contains. Decided once at ingestion and never
/// re-inspected downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// An existing paginated document (PDF).
    Existing,
    /// A raster image (PNG or JPEG).
    Raster,
    /// An existing structured document (DOCX), only ever read.
    Structured,
}

/// Which conversion a session performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionMode {
    /// Merge PDFs and images into one PDF.
    Merge,
    /// Turn images into a PDF, one page per image.
    Images,
    /// Rebuild a DOCX from a PDF's text and images.
    Reconstruct,
    /// Lay out a DOCX's paragraphs as a PDF.
    StructuredToPdf,
}

impl ConversionMode {
    /// Whether this mode accepts items of the given kind.
    pub fn accepts(&self, kind: SourceKind) -> bool {
        match self {
            Self::Merge => matches!(kind, SourceKind::Existing | SourceKind::Raster),
            Self::Images => kind == SourceKind::Raster,
            Self::Reconstruct => kind == SourceKind::Existing,
            Self::StructuredToPdf => kind == SourceKind::Structured,
        }
    }
}

/// Horizontal half of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical half of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// One of the nine placement positions on a page.
///
/// Textual codes combine the letters `l`/`r` and `t`/`b`; a missing letter on
/// an axis means centre on that axis, and `c` may be spelled out explicitly
/// (`"cc"`, `"ct"`, `"t"` and `""` are all valid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Anchor {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
}

impl Anchor {
    pub const fn new(horizontal: HorizontalAlign, vertical: VerticalAlign) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// All nine anchors, row by row from the top.
    pub fn all() -> [Anchor; 9] {
        use HorizontalAlign as H;
        use VerticalAlign as V;
        [
            Self::new(H::Left, V::Top),
            Self::new(H::Center, V::Top),
            Self::new(H::Right, V::Top),
            Self::new(H::Left, V::Center),
            Self::new(H::Center, V::Center),
            Self::new(H::Right, V::Center),
            Self::new(H::Left, V::Bottom),
            Self::new(H::Center, V::Bottom),
            Self::new(H::Right, V::Bottom),
        ]
    }

    /// Canonical two-letter code, horizontal first (`"lt"`, `"cc"`, `"rb"`).
    pub fn code(&self) -> &'static str {
        use HorizontalAlign as H;
        use VerticalAlign as V;
        match (self.horizontal, self.vertical) {
            (H::Left, V::Top) => "lt",
            (H::Center, V::Top) => "ct",
            (H::Right, V::Top) => "rt",
            (H::Left, V::Center) => "lc",
            (H::Center, V::Center) => "cc",
            (H::Right, V::Center) => "rc",
            (H::Left, V::Bottom) => "lb",
            (H::Center, V::Bottom) => "cb",
            (H::Right, V::Bottom) => "rb",
        }
    }
}

impl FromStr for Anchor {
    type Err = FolioError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let mut horizontal: Option<HorizontalAlign> = None;
        let mut vertical: Option<VerticalAlign> = None;

        for letter in code.trim().chars().map(|c| c.to_ascii_lowercase()) {
            let (slot_h, slot_v) = match letter {
                'l' => (Some(HorizontalAlign::Left), None),
                'r' => (Some(HorizontalAlign::Right), None),
                't' => (None, Some(VerticalAlign::Top)),
                'b' => (None, Some(VerticalAlign::Bottom)),
                'c' => continue,
                other => {
                    return Err(FolioError::InputValidation(format!(
                        "unknown anchor letter '{other}' in \"{code}\""
                    )));
                }
            };
            if let Some(h) = slot_h {
                if horizontal.is_some_and(|existing| existing != h) {
                    return Err(FolioError::InputValidation(format!(
                        "anchor \"{code}\" names both left and right"
                    )));
                }
                horizontal = Some(h);
            }
            if let Some(v) = slot_v {
                if vertical.is_some_and(|existing| existing != v) {
                    return Err(FolioError::InputValidation(format!(
                        "anchor \"{code}\" names both top and bottom"
                    )));
                }
                vertical = Some(v);
            }
        }

        Ok(Self::new(
            horizontal.unwrap_or_default(),
            vertical.unwrap_or_default(),
        ))
    }
}

impl TryFrom<String> for Anchor {
    type Error = FolioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Anchor> for String {
    fn from(anchor: Anchor) -> Self {
        anchor.code().to_string()
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Placement of a raster image on its composed page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageLayout {
    /// User scale in `(0, 1]`, applied on top of fit-to-box scaling.
    pub scale: f64,
    pub anchor: Anchor,
}

impl Default for ImageLayout {
    fn default() -> Self {
        Self {
            scale: 1.0,
            anchor: Anchor::default(),
        }
    }
}

impl ImageLayout {
    pub fn validate(&self) -> Result<(), FolioError> {
        if !(self.scale > 0.0 && self.scale <= 1.0) {
            return Err(FolioError::InputValidation(format!(
                "image scale must be in (0, 1], got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

/// One input to a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    /// Caller-controlled position in the output.
    pub order: u32,
    pub kind: SourceKind,
    /// Label used in diagnostics (usually the file name).
    pub name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Only meaningful for `Raster` items in composition mode.
    pub layout: Option<ImageLayout>,
}

impl SourceItem {
    pub fn existing(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            order: 0,
            kind: SourceKind::Existing,
            name: name.into(),
            bytes,
            layout: None,
        }
    }

    pub fn raster(name: impl Into<String>, bytes: Vec<u8>, layout: ImageLayout) -> Self {
        Self {
            order: 0,
            kind: SourceKind::Raster,
            name: name.into(),
            bytes,
            layout: Some(layout),
        }
    }

    pub fn structured(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            order: 0,
            kind: SourceKind::Structured,
            name: name.into(),
            bytes,
            layout: None,
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }
}

/// Which output pages receive the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayScope {
    #[default]
    All,
    First,
    Last,
}

impl OverlayScope {
    /// Resolve to concrete 0-based page indices for a document of
    /// `page_count` pages.
    pub fn resolve(&self, page_count: usize) -> Vec<usize> {
        if page_count == 0 {
            return Vec::new();
        }
        match self {
            Self::All => (0..page_count).collect(),
            Self::First => vec![0],
            Self::Last => vec![page_count - 1],
        }
    }

    pub fn includes(&self, index: usize, page_count: usize) -> bool {
        match self {
            Self::All => index < page_count,
            Self::First => index == 0 && page_count > 0,
            Self::Last => page_count > 0 && index == page_count - 1,
        }
    }
}

impl FromStr for OverlayScope {
    type Err = FolioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(FolioError::InputValidation(format!(
                "unknown overlay scope \"{other}\""
            ))),
        }
    }
}

/// Rotation-independent placement of a signature-like image.
///
/// Percentages refer to the page as the reader sees it in portrait, with
/// `y_percent` measured from the bottom edge to the image's bottom edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayProfile {
    /// Encoded PNG or JPEG bytes.
    #[serde(skip)]
    pub image: Vec<u8>,
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_points: f64,
    pub scope: OverlayScope,
}

impl OverlayProfile {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            x_percent: 0.7,
            y_percent: 0.1,
            width_points: 150.0,
            scope: OverlayScope::All,
        }
    }

    pub fn validate(&self) -> Result<(), FolioError> {
        if self.image.is_empty() {
            return Err(FolioError::InputValidation(
                "overlay image is empty".into(),
            ));
        }
        for (label, value) in [("x", self.x_percent), ("y", self.y_percent)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FolioError::InputValidation(format!(
                    "overlay {label} position must be within [0, 1], got {value}"
                )));
            }
        }
        if !(self.width_points > 0.0 && self.width_points.is_finite()) {
            return Err(FolioError::InputValidation(format!(
                "overlay width must be positive, got {}",
                self.width_points
            )));
        }
        Ok(())
    }
}

/// Physical size and rotation of one page, read at placement time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_pt: f64,
    pub height_pt: f64,
    /// One of 0, 90, 180, 270.
    pub rotation_deg: i64,
}

/// An (x, y) position in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A width/height pair in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_pt: f64, height_pt: f64 },
}

impl PaperSize {
    /// Dimensions in points (width, height), portrait.
    pub fn dimensions_pt(&self) -> (f64, f64) {
        match self {
            Self::A4 => (595.28, 841.89),
            Self::A3 => (841.89, 1190.55),
            Self::A5 => (419.53, 595.28),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
        }
    }

    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f64, f64) {
        let (w, h) = self.dimensions_pt();
        (w * MM_PER_PT, h * MM_PER_PT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_codes_parse_with_implicit_center() {
        let top: Anchor = "t".parse().unwrap();
        assert_eq!(top, Anchor::new(HorizontalAlign::Center, VerticalAlign::Top));

        let empty: Anchor = "".parse().unwrap();
        assert_eq!(empty, Anchor::default());

        let right_bottom: Anchor = "RB".parse().unwrap();
        assert_eq!(
            right_bottom,
            Anchor::new(HorizontalAlign::Right, VerticalAlign::Bottom)
        );
    }

    #[test]
    fn every_canonical_code_parses_back() {
        for anchor in Anchor::all() {
            assert_eq!(anchor.code().parse::<Anchor>().unwrap(), anchor);
        }
    }

    #[test]
    fn conflicting_anchor_letters_are_rejected() {
        assert!(matches!(
            "lr".parse::<Anchor>(),
            Err(FolioError::InputValidation(_))
        ));
        assert!(matches!(
            "tb".parse::<Anchor>(),
            Err(FolioError::InputValidation(_))
        ));
        assert!("x".parse::<Anchor>().is_err());
    }

    #[test]
    fn anchor_serializes_as_code() {
        let layout = ImageLayout {
            scale: 0.5,
            anchor: "lt".parse().unwrap(),
        };
        let json = serde_json::to_string(&layout).unwrap();
        assert!(json.contains("\"lt\""));
        let back: ImageLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);
    }

    #[test]
    fn scope_resolution() {
        assert_eq!(OverlayScope::All.resolve(3), vec![0, 1, 2]);
        assert_eq!(OverlayScope::First.resolve(3), vec![0]);
        assert_eq!(OverlayScope::Last.resolve(3), vec![2]);
        assert!(OverlayScope::Last.resolve(0).is_empty());
        assert!(OverlayScope::Last.includes(2, 3));
        assert!(!OverlayScope::First.includes(1, 3));
    }

    #[test]
    fn overlay_validation() {
        let mut profile = OverlayProfile::new(vec![1, 2, 3]);
        assert!(profile.validate().is_ok());

        profile.x_percent = 1.2;
        assert!(profile.validate().is_err());

        profile.x_percent = 0.5;
        profile.width_points = 0.0;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn layout_scale_bounds() {
        assert!(ImageLayout::default().validate().is_ok());
        let zero = ImageLayout {
            scale: 0.0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn mode_accepts_matching_kinds() {
        assert!(ConversionMode::Merge.accepts(SourceKind::Raster));
        assert!(!ConversionMode::Images.accepts(SourceKind::Existing));
        assert!(!ConversionMode::Reconstruct.accepts(SourceKind::Structured));
        assert!(ConversionMode::StructuredToPdf.accepts(SourceKind::Structured));
    }

    #[test]
    fn a4_in_millimetres() {
        let (w, h) = PaperSize::A4.dimensions_mm();
        assert!((w - 210.0).abs() < 0.01);
        assert!((h - 297.0).abs() < 0.01);
    }
}
