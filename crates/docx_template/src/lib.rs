//! DOCX Template Engine
//!
//! This crate turns a Word certificate template into a filled-in certificate.
//! It works directly on the WordprocessingML text of the package parts and
//! never builds a full document model.
//!
//! ## Pipeline
//!
//! 1. [`extract_placeholders`] finds `{{name}}` tokens in part XML.
//! 2. [`Repairer`] rejoins tokens that the word processor's proofing and
//!    autocorrect machinery split across several runs.
//! 3. [`Renderer`] substitutes values and embeds an optional QR image, either
//!    inline where `{{QRCode}}` was authored or anchored to a page corner.
//!
//! ## Structure
//!
//! A DOCX file is a ZIP archive containing XML parts:
//! - `[Content_Types].xml` - Content type definitions
//! - `_rels/.rels` - Root relationships
//! - `word/document.xml` - Main document content
//! - `word/_rels/document.xml.rels` - Document relationships
//! - `word/header*.xml`, `word/footer*.xml` - Header and footer content
//! - `word/media/` - Embedded images

mod error;
mod reader;
mod writer;
mod content_types;
mod relationships;
mod package;
mod text_nodes;
mod placeholder;
mod repair;
mod substitute;
mod drawing;
mod qr;
mod options;
mod render;

pub use error::{TemplateRenderError, TemplateResult};
pub use package::DocxPackage;
pub use reader::{ArchiveEntry, DocxReader};
pub use writer::{write_to_vec, DocxWriter};
pub use content_types::ContentTypes;
pub use relationships::{Relationship, Relationships, TargetMode};
pub use placeholder::{extract_placeholders, is_placeholder_name, placeholder_pattern};
pub use repair::{repair_xml, RepairPass, RepairReport, Repaired, Repairer};
pub use substitute::{SubstitutionReport, Substituter};
pub use drawing::{twips_to_emu, DrawingIds, PageSize, EMU_PER_INCH, EMU_PER_TWIP};
pub use qr::{QrImage, QrPlacement, ReplacementTier};
pub use options::{AnchorCorner, RenderOptions, DEFAULT_QR_MARKER};
pub use render::{extract_from_docx, PlaceholderValues, RenderContext, RenderedCertificate, Renderer};

/// XML namespaces used in DOCX files
pub mod namespaces {
    /// Main WordprocessingML namespace
    pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    /// Relationships namespace
    pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    /// Package relationships namespace
    pub const PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    /// Content types namespace
    pub const CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
    /// DrawingML namespace
    pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    /// WordprocessingML Drawing namespace
    pub const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
    /// Picture namespace
    pub const PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
}

/// Relationship types used in DOCX
pub mod relationship_types {
    pub const DOCUMENT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const HEADER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
    pub const FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
    pub const STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
}

/// Content types for DOCX parts
pub mod content_type_values {
    pub const DOCUMENT: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";
    pub const PNG: &str = "image/png";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        assert!(namespaces::W.contains("wordprocessingml"));
        assert!(relationship_types::IMAGE.ends_with("/image"));
    }
}
