// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text positioning state: transformation matrices, the text state operators
// track, and decoding of string operands.

use lopdf::Object;

use super::GlyphRun;
use crate::pdf::objects::as_number;

/// Average glyph advance as a fraction of the font size. Font metrics are
/// not consulted, so horizontal positions after the first run on a line are
/// approximate.
const AVG_GLYPH_WIDTH_EM: f64 = 0.5;

/// A PDF transformation matrix `[a b c d e f]`, applied to row vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(values: [f64; 6]) -> Self {
        let [a, b, c, d, e, f] = values;
        Self { a, b, c, d, e, f }
    }

    /// Read six numeric operands (as given to `cm` and `Tm`).
    pub fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let mut values = [0.0; 6];
        for (slot, operand) in values.iter_mut().zip(operands) {
            *slot = as_number(operand)?;
        }
        Some(Self::new(values))
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit y vector.
    pub fn vertical_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Text state carried across text objects, plus the per-object text and
/// line matrices.
#[derive(Debug, Clone)]
pub struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    leading: f64,
    /// `Tz` as a fraction (100% is 1.0).
    horizontal_scale: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
            horizontal_scale: 1.0,
            rise: 0.0,
        }
    }
}

impl TextState {
    /// `BT`
    pub fn begin(&mut self) {
        self.matrix = Matrix::IDENTITY;
        self.line_matrix = Matrix::IDENTITY;
    }

    /// `Tm`
    pub fn set_matrix(&mut self, matrix: Matrix) {
        self.matrix = matrix;
        self.line_matrix = matrix;
    }

    /// `Td`
    pub fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).multiply(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    /// `T*`
    pub fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
    }

    pub fn set_leading(&mut self, leading: f64) {
        self.leading = leading;
    }

    pub fn set_horizontal_scale(&mut self, percent: f64) {
        self.horizontal_scale = percent / 100.0;
    }

    pub fn set_rise(&mut self, rise: f64) {
        self.rise = rise;
    }

    /// A run for `text` starting at the current text position.
    pub fn run(&self, text: String, ctm: &Matrix) -> GlyphRun {
        let to_user = self.matrix.multiply(ctm);
        let (x, y) = to_user.apply(0.0, self.rise);
        GlyphRun::new(text, x, y, self.font_size * to_user.vertical_scale())
    }

    /// Advance past `glyphs` characters.
    pub fn advance(&mut self, glyphs: usize) {
        let tx = glyphs as f64 * AVG_GLYPH_WIDTH_EM * self.font_size * self.horizontal_scale;
        self.matrix = Matrix::translation(tx, 0.0).multiply(&self.matrix);
    }

    /// Apply a `TJ` position adjustment, in thousandths of a text unit.
    pub fn adjust(&mut self, thousandths: f64) {
        let tx = -thousandths / 1000.0 * self.font_size * self.horizontal_scale;
        self.matrix = Matrix::translation(tx, 0.0).multiply(&self.matrix);
    }
}

/// Decode a string operand: UTF-16BE when it starts with a byte order mark,
/// otherwise one character per byte (Latin-1).
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&byte| byte as char).collect(),
    }
}
