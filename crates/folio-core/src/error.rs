// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Input errors --
    /// The wrong kind of file was presented to a mode, or a parameter is out
    /// of range.
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("source document could not be parsed: {0}")]
    SourceParse(String),

    // -- Geometry / decode preconditions --
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    #[error("unsupported page rotation: {0} degrees")]
    UnsupportedRotation(i64),

    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    // -- Pipeline errors --
    /// Page-level failure. Only fatal outside reconstruction mode.
    #[error("extraction failed on page {page}: {detail}")]
    Extraction { page: usize, detail: String },

    #[error("composition failed: {0}")]
    Composition(String),

    #[error("output encoding failed: {0}")]
    OutputEncoding(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
