//! In-memory DOCX package
//!
//! Keeps every archive entry in its original order so a rendered certificate
//! differs from its template only in the parts the renderer touched.

use crate::content_types::ContentTypes;
use crate::error::{TemplateRenderError, TemplateResult};
use crate::reader::{ArchiveEntry, DocxReader};
use crate::relationship_types;
use crate::relationships::Relationships;
use crate::writer::write_to_vec;
use std::io::Cursor;

const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
const ROOT_RELS_PATH: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// A decompressed DOCX archive
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<ArchiveEntry>,
}

impl DocxPackage {
    /// Decompress a DOCX held in memory
    pub fn from_bytes(bytes: &[u8]) -> TemplateResult<Self> {
        let mut reader = DocxReader::new(Cursor::new(bytes))?;
        let entries = reader.read_all()?;
        Ok(Self { entries })
    }

    /// Path of the main document part.
    ///
    /// Follows the officeDocument relationship in `_rels/.rels` and falls back
    /// to `word/document.xml` when the package has no root relationships.
    pub fn main_document_path(&self) -> TemplateResult<String> {
        let from_rels = match self.get(ROOT_RELS_PATH) {
            Some(data) => {
                let rels = Relationships::parse(std::str::from_utf8(data).map_err(|e| {
                    TemplateRenderError::Xml(format!("{} is not UTF-8: {}", ROOT_RELS_PATH, e))
                })?)?;
                rels.get_by_type(relationship_types::DOCUMENT)
                    .map(|r| resolve_target("", &r.target))
            }
            None => None,
        };
        let path = from_rels.unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
        if self.contains(&path) {
            Ok(path)
        } else {
            Err(TemplateRenderError::MissingPart(path))
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.name == path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.iter().find(|e| e.name == path).map(|e| e.data.as_slice())
    }

    /// Read a part as text
    pub fn read_xml(&self, path: &str) -> TemplateResult<String> {
        let data = self
            .get(path)
            .ok_or_else(|| TemplateRenderError::MissingPart(path.to_string()))?;
        Ok(String::from_utf8(data.to_vec())?)
    }

    /// Replace a part in place, or append it when new
    pub fn put(&mut self, path: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| e.name == path) {
            Some(entry) => entry.data = data,
            None => self.entries.push(ArchiveEntry {
                name: path.to_string(),
                data,
            }),
        }
    }

    pub fn write_xml(&mut self, path: &str, xml: String) {
        self.put(path, xml.into_bytes());
    }

    /// Relationships of a part; empty when the part has no .rels file
    pub fn relationships(&self, part: &str) -> TemplateResult<Relationships> {
        let path = rels_path(part);
        if self.contains(&path) {
            Relationships::parse(&self.read_xml(&path)?)
        } else {
            Ok(Relationships::new())
        }
    }

    pub fn write_relationships(&mut self, part: &str, rels: &Relationships) {
        self.write_xml(&rels_path(part), rels.to_xml());
    }

    pub fn content_types(&self) -> TemplateResult<ContentTypes> {
        if self.contains(CONTENT_TYPES_PATH) {
            ContentTypes::parse(&self.read_xml(CONTENT_TYPES_PATH)?)
        } else {
            Ok(ContentTypes::new())
        }
    }

    pub fn write_content_types(&mut self, content_types: &ContentTypes) {
        self.write_xml(CONTENT_TYPES_PATH, content_types.to_xml());
    }

    /// Header and footer parts referenced by `part`, in relationship order
    pub fn header_footer_parts(&self, part: &str) -> TemplateResult<Vec<String>> {
        let rels = self.relationships(part)?;
        Ok(rels
            .all()
            .filter(|r| r.rel_type == relationship_types::HEADER || r.rel_type == relationship_types::FOOTER)
            .map(|r| resolve_target(part, &r.target))
            .filter(|path| self.contains(path))
            .collect())
    }

    /// Number of entries under `word/media/`
    pub fn media_count(&self) -> usize {
        self.entries.iter().filter(|e| e.name.starts_with("word/media/")).count()
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Compress the package back into DOCX bytes
    pub fn to_bytes(&self) -> TemplateResult<Vec<u8>> {
        write_to_vec(&self.entries)
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
pub(crate) fn rels_path(part: &str) -> String {
    let (dir, file) = split_part(part);
    format!("{}_rels/{}.rels", dir, file)
}

/// Directory of a part including the trailing slash, e.g. `word/`
pub(crate) fn part_dir(part: &str) -> &str {
    split_part(part).0
}

fn split_part(part: &str) -> (&str, &str) {
    match part.rfind('/') {
        Some(i) => (&part[..=i], &part[i + 1..]),
        None => ("", part),
    }
}

/// Resolve a relationship target against the part that owns the .rels file
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = part_dir(source_part).split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/main.xml"/></Relationships>"#;

    #[test]
    fn test_main_document_from_root_rels() {
        let bytes = archive(&[("_rels/.rels", ROOT_RELS), ("word/main.xml", "<w:document/>")]);
        let package = DocxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(package.main_document_path().unwrap(), "word/main.xml");
    }

    #[test]
    fn test_main_document_default_and_missing() {
        let bytes = archive(&[("word/document.xml", "<w:document/>")]);
        let package = DocxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(package.main_document_path().unwrap(), "word/document.xml");

        let bytes = archive(&[("word/styles.xml", "<w:styles/>")]);
        let package = DocxPackage::from_bytes(&bytes).unwrap();
        assert!(matches!(package.main_document_path(), Err(TemplateRenderError::MissingPart(_))));
    }

    #[test]
    fn test_put_keeps_order() {
        let bytes = archive(&[("a.xml", "<a/>"), ("b.xml", "<b/>")]);
        let mut package = DocxPackage::from_bytes(&bytes).unwrap();
        package.write_xml("a.xml", "<a2/>".into());
        package.put("word/media/qrcode.png", vec![1, 2, 3]);

        let reopened = DocxPackage::from_bytes(&package.to_bytes().unwrap()).unwrap();
        let names: Vec<&str> = reopened.entry_names().collect();
        assert_eq!(names, vec!["a.xml", "b.xml", "word/media/qrcode.png"]);
        assert_eq!(reopened.read_xml("a.xml").unwrap(), "<a2/>");
        assert_eq!(reopened.media_count(), 1);
    }

    #[test]
    fn test_header_footer_parts() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId8" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/><Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="/word/header1.xml"/><Relationship Id="rId10" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header2.xml"/></Relationships>"#;
        let bytes = archive(&[
            ("word/document.xml", "<w:document/>"),
            ("word/_rels/document.xml.rels", rels),
            ("word/footer1.xml", "<w:ftr/>"),
            ("word/header1.xml", "<w:hdr/>"),
        ]);
        let package = DocxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(
            package.header_footer_parts("word/document.xml").unwrap(),
            vec!["word/footer1.xml", "word/header1.xml"]
        );
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(rels_path("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(part_dir("word/document.xml"), "word/");
        assert_eq!(resolve_target("word/document.xml", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word/document.xml", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
    }
}
