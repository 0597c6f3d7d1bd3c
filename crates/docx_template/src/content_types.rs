//! [Content_Types].xml parsing and generation
//!
//! This file defines the content types for all parts in the DOCX package.
//! A media file whose extension has no `Default` entry makes Word refuse the
//! whole package, so image embedding goes through [`ContentTypes::ensure_default`].

use crate::error::{TemplateRenderError, TemplateResult};
use crate::reader::{escape_xml, XmlParser};
use quick_xml::events::Event;

/// Represents the content types in a DOCX package
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    /// Default content types by extension (e.g., "xml" -> "application/xml")
    pub defaults: Vec<(String, String)>,
    /// Override content types by part name (e.g., "/word/document.xml" -> "...")
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Create a new ContentTypes with the defaults every package needs
    pub fn new() -> Self {
        let mut ct = Self::default();
        ct.ensure_default("rels", crate::content_type_values::RELATIONSHIPS);
        ct.ensure_default("xml", crate::content_type_values::XML);
        ct
    }

    /// Parse [Content_Types].xml from its content
    pub fn parse(content: &str) -> TemplateResult<Self> {
        let mut result = Self::default();
        let mut reader = XmlParser::from_string(content);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    if XmlParser::matches_element(name.as_ref(), "Default") {
                        if let (Some(ext), Some(ct)) = (
                            XmlParser::get_attribute(e, b"Extension"),
                            XmlParser::get_attribute(e, b"ContentType"),
                        ) {
                            result.defaults.push((ext, ct));
                        }
                    } else if XmlParser::matches_element(name.as_ref(), "Override") {
                        if let (Some(part), Some(ct)) = (
                            XmlParser::get_attribute(e, b"PartName"),
                            XmlParser::get_attribute(e, b"ContentType"),
                        ) {
                            result.overrides.push((part, ct));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(TemplateRenderError::from(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(result)
    }

    /// Get the content type for a given path
    pub fn get_content_type(&self, path: &str) -> Option<&str> {
        let normalized_path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        if let Some((_, ct)) = self.overrides.iter().find(|(p, _)| *p == normalized_path) {
            return Some(ct);
        }

        // Extensions are matched case-insensitively, as Word does
        let ext = path.rsplit('.').next()?;
        self.defaults
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, ct)| ct.as_str())
    }

    /// Register a default for an extension unless one already exists.
    ///
    /// Returns `true` if an entry was added.
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) -> bool {
        if self.defaults.iter().any(|(e, _)| e.eq_ignore_ascii_case(extension)) {
            return false;
        }
        self.defaults.push((extension.to_string(), content_type.to_string()));
        true
    }

    /// Generate XML content for [Content_Types].xml
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);

        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext), escape_xml(ct)
            ));
        }

        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(part), escape_xml(ct)
            ));
        }

        xml.push_str("</Types>");
        xml
    }
}
