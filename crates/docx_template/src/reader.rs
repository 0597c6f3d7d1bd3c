//! ZIP archive reading and XML parsing utilities

use crate::error::TemplateResult;
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// A single file stored in a DOCX archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive (e.g. `word/document.xml`)
    pub name: String,
    /// Raw, decompressed bytes
    pub data: Vec<u8>,
}

/// A wrapper around a ZIP archive for reading DOCX files
pub struct DocxReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> DocxReader<R> {
    /// Create a new DOCX reader from a source that implements Read + Seek
    pub fn new(reader: R) -> TemplateResult<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self { archive })
    }

    /// Read every file in archive order.
    ///
    /// Directory entries are skipped; they carry no data and Word does not
    /// need them.
    pub fn read_all(&mut self) -> TemplateResult<Vec<ArchiveEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let mut file = self.archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(ArchiveEntry { name, data });
        }
        Ok(entries)
    }
}

/// XML reader utilities for parsing package manifests
pub struct XmlParser;

impl XmlParser {
    /// Create a new XML reader from a string
    pub fn from_string(content: &str) -> Reader<&[u8]> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        reader
    }

    /// Get an attribute value from an event
    pub fn get_attribute(event: &quick_xml::events::BytesStart, name: &[u8]) -> Option<String> {
        event.attributes()
            .filter_map(|a| a.ok())
            .find(|a| a.key.as_ref() == name)
            .map(|a| {
                a.unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).to_string())
            })
    }

    /// Check if an element name matches with optional namespace prefix
    pub fn matches_element(name: &[u8], expected: &str) -> bool {
        let name_str = std::str::from_utf8(name).unwrap_or("");
        name_str == expected || name_str.ends_with(&format!(":{}", expected))
    }
}

/// Escape text for use inside element content or attribute values
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateRenderError;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn archive_with(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_all_preserves_order() {
        let bytes = archive_with(&[("b.xml", "<b/>"), ("a.xml", "<a/>")]);
        let mut reader = DocxReader::new(Cursor::new(bytes)).unwrap();
        let entries = reader.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "b.xml");
        assert_eq!(entries[1].data, b"<a/>");
    }

    #[test]
    fn test_read_all_skips_directories() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.add_directory("word/", SimpleFileOptions::default()).unwrap();
        zip.start_file("word/document.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let entries = DocxReader::new(Cursor::new(bytes)).unwrap().read_all().unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["word/document.xml"]);
    }

    #[test]
    fn test_not_a_zip() {
        let result = DocxReader::new(Cursor::new(b"plain text".to_vec()));
        assert!(matches!(result, Err(TemplateRenderError::Archive(_))));
    }

    #[test]
    fn test_matches_element() {
        assert!(XmlParser::matches_element(b"Relationship", "Relationship"));
        assert!(XmlParser::matches_element(b"pr:Relationship", "Relationship"));
        assert!(!XmlParser::matches_element(b"Relationships", "Relationship"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("A & B <c>"), "A &amp; B &lt;c&gt;");
    }
}
