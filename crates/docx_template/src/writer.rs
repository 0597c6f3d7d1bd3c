//! DOCX Writer Infrastructure
//!
//! Writes package entries back into a ZIP archive in their original order.

use crate::error::TemplateResult;
use crate::reader::ArchiveEntry;
use std::io::{Cursor, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Main DOCX writer
pub struct DocxWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> DocxWriter<W> {
    /// Create a new DOCX writer
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
        }
    }

    /// Write every entry and finish the archive
    pub fn write_entries(mut self, entries: &[ArchiveEntry]) -> TemplateResult<W> {
        for entry in entries {
            if is_media(&entry.name) {
                self.write_binary(&entry.name, &entry.data)?;
            } else {
                self.write_file(&entry.name, &entry.data)?;
            }
        }
        Ok(self.zip.finish()?)
    }

    /// Write an XML part to the ZIP archive
    pub fn write_file(&mut self, path: &str, content: &[u8]) -> TemplateResult<()> {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        self.zip.start_file(path, options)?;
        self.zip.write_all(content)?;

        Ok(())
    }

    /// Write binary data to the ZIP archive
    pub fn write_binary(&mut self, path: &str, data: &[u8]) -> TemplateResult<()> {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored); // Don't compress binary

        self.zip.start_file(path, options)?;
        self.zip.write_all(data)?;

        Ok(())
    }
}

/// Serialize entries into an in-memory DOCX
pub fn write_to_vec(entries: &[ArchiveEntry]) -> TemplateResult<Vec<u8>> {
    let cursor = DocxWriter::new(Cursor::new(Vec::new())).write_entries(entries)?;
    Ok(cursor.into_inner())
}

fn is_media(path: &str) -> bool {
    path.contains("/media/")
}
