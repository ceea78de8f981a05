// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The taxonomy uses three severity levels that drive presentation.

use crate::error::FolioError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something outside the files went wrong (disk full, interrupted write).
    Transient,
    /// User must change the input (pick another file, fix a setting).
    ActionRequired,
    /// The file itself cannot be converted.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether running the same conversion again could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `FolioError` into a `HumanError`.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        FolioError::InputValidation(detail) => HumanError {
            message: "Those settings or files can't be used together.".into(),
            suggestion: format!("Check the chosen files and options, then try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FolioError::SourceParse(_) => HumanError {
            message: "This document couldn't be opened.".into(),
            suggestion: "The file may be damaged or password-protected. Try opening it in another program first, or choose a different file.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::InvalidDimensions { .. } => HumanError {
            message: "This image has no usable size.".into(),
            suggestion: "The image may be empty or damaged. Try re-saving it as a PNG or JPEG.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::UnsupportedRotation(degrees) => HumanError {
            message: "A page in this document is turned at an unusual angle.".into(),
            suggestion: format!("Only quarter turns are supported (this page is turned {degrees} degrees). Straighten the page in a PDF editor first."),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::UnsupportedImageFormat(detail) => HumanError {
            message: "This type of image isn't supported.".into(),
            suggestion: format!("Save the image as a PNG or JPEG and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FolioError::Extraction { page, .. } => HumanError {
            message: format!("Some content on page {page} couldn't be read."),
            suggestion: "The rest of the document was converted. Check that page in the result.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::Composition(detail) => HumanError {
            message: "The documents couldn't be combined.".into(),
            suggestion: format!("One of the files is damaged. Remove it from the list and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FolioError::OutputEncoding(_) => HumanError {
            message: "The finished document couldn't be written.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FolioError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "There's no permission to read or write that file.".into(),
                    suggestion: "Check the file permissions, or try a different location.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        FolioError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Check that the config file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
