//! Error types for template rendering

use thiserror::Error;

/// Errors that abort a single render call.
///
/// Unmatched placeholders, split tokens the repairer could not rejoin and a
/// QR marker that has to fall back to page anchoring are not errors; they are
/// reported on the result and logged.
#[derive(Debug, Error)]
pub enum TemplateRenderError {
    /// IO error while reading or writing the archive
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The template is not a readable ZIP archive
    #[error("ZIP error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// XML parsing error in a package part
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// A required package part is missing
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Malformed placeholder syntax that repair cannot fix
    #[error("Template syntax error in {part}: {message}")]
    Syntax {
        /// Part name (e.g. `word/document.xml`)
        part: String,
        /// Diagnostic describing the offending token
        message: String,
    },

    /// The QR payload could not be decoded
    #[error("Invalid QR image payload: {0}")]
    InvalidImage(String),

    /// The template already contains the reserved QR marker text
    #[error("Template already contains the reserved marker {0:?}")]
    MarkerCollision(String),

    /// Render options that cannot produce a valid document
    #[error("Invalid render options: {0}")]
    InvalidOptions(String),

    /// A part is not valid UTF-8
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<quick_xml::Error> for TemplateRenderError {
    fn from(err: quick_xml::Error) -> Self {
        TemplateRenderError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for TemplateRenderError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        TemplateRenderError::Xml(format!("Attribute error: {}", err))
    }
}

/// Result type for template operations
pub type TemplateResult<T> = std::result::Result<T, TemplateRenderError>;
