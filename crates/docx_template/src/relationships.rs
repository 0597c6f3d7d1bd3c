//! Relationships (.rels) file parsing and generation
//!
//! DOCX uses relationships to connect parts of the document together. An
//! embedded image is only visible to Word when the `r:embed` id in the body
//! has a matching entry here.

use crate::error::{TemplateRenderError, TemplateResult};
use crate::reader::{escape_xml, XmlParser};
use quick_xml::events::Event;

/// A single relationship in a .rels file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Unique ID within the rels file (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative to the source part)
    pub target: String,
    /// Target mode (Internal or External)
    pub target_mode: TargetMode,
}

/// Target mode for relationships
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Internal target within the package
    #[default]
    Internal,
    /// External target (URL)
    External,
}

/// Collection of relationships from a .rels file, in document order
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    relationships: Vec<Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a .rels file from its XML content
    pub fn parse(content: &str) -> TemplateResult<Self> {
        let mut result = Self::new();
        let mut reader = XmlParser::from_string(content);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    if XmlParser::matches_element(name.as_ref(), "Relationship") {
                        let id = XmlParser::get_attribute(e, b"Id")
                            .ok_or_else(|| TemplateRenderError::Xml("Relationship missing Id".into()))?;
                        let rel_type = XmlParser::get_attribute(e, b"Type")
                            .ok_or_else(|| TemplateRenderError::Xml("Relationship missing Type".into()))?;
                        let target = XmlParser::get_attribute(e, b"Target")
                            .ok_or_else(|| TemplateRenderError::Xml("Relationship missing Target".into()))?;
                        let target_mode = XmlParser::get_attribute(e, b"TargetMode")
                            .map(|m| if m == "External" { TargetMode::External } else { TargetMode::Internal })
                            .unwrap_or(TargetMode::Internal);

                        result.relationships.push(Relationship {
                            id,
                            rel_type,
                            target,
                            target_mode,
                        });
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

    /// Add a relationship under a caller-chosen id.
    ///
    /// Returns `false` and leaves the collection untouched when the id is
    /// already taken.
    pub fn insert_with_id(&mut self, id: &str, rel_type: &str, target: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.relationships.push(Relationship {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            target_mode: TargetMode::Internal,
        });
        true
    }

    /// Get a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    /// Get a relationship by type
    pub fn get_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.rel_type == rel_type)
    }

    /// Check if a relationship exists
    pub fn contains(&self, id: &str) -> bool {
        self.relationships.iter().any(|r| r.id == id)
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Get all relationships
    pub fn all(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    /// Generate XML content for the .rels file
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);

        for rel in &self.relationships {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape_xml(&rel.id), escape_xml(&rel.rel_type), escape_xml(&rel.target)
            ));
            if rel.target_mode == TargetMode::External {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship_types;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
    <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_relationships_parsing() {
        let rels = Relationships::parse(RELS).unwrap();
        assert_eq!(rels.len(), 2);

        let r1 = rels.get("rId3").unwrap();
        assert_eq!(r1.target, "styles.xml");
        assert_eq!(r1.target_mode, TargetMode::Internal);

        let r2 = rels.get("rId7").unwrap();
        assert_eq!(r2.target, "https://example.com/?a=1&b=2");
        assert_eq!(r2.target_mode, TargetMode::External);
    }

    #[test]
    fn test_insert_with_id_guards_collisions() {
        let mut rels = Relationships::new();
        assert!(rels.insert_with_id("rIdQrCode", relationship_types::IMAGE, "media/qrcode.png"));
        assert!(!rels.insert_with_id("rIdQrCode", relationship_types::IMAGE, "media/other.png"));
        assert_eq!(rels.len(), 1);
        assert_eq!(rels.get("rIdQrCode").unwrap().target, "media/qrcode.png");
    }

    #[test]
    fn test_to_xml_roundtrip_keeps_order() {
        let original = Relationships::parse(RELS).unwrap();
        let parsed = Relationships::parse(&original.to_xml()).unwrap();

        let ids: Vec<&str> = parsed.all().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rId3", "rId7"]);
        assert_eq!(parsed.get("rId7").unwrap().target, "https://example.com/?a=1&b=2");
    }
}
