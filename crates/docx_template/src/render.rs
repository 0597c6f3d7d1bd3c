//! Certificate rendering
//!
//! One call decompresses its own copy of the template, so a [`Renderer`] can
//! be shared freely between threads rendering different rows.

use crate::error::{TemplateRenderError, TemplateResult};
use crate::options::RenderOptions;
use crate::package::{part_dir, DocxPackage};
use crate::placeholder::extract_placeholders;
use crate::qr::{QrImage, QrInjector, QrPlacement};
use crate::relationship_types;
use crate::repair::Repairer;
use crate::substitute::{SubstitutionReport, Substituter};
use std::collections::HashMap;

/// Placeholder name to display value
pub type PlaceholderValues = HashMap<String, String>;

/// Inputs of one render
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Template DOCX bytes
    pub template: &'a [u8],
    pub values: &'a PlaceholderValues,
    /// QR image as a data URL or bare base64
    pub qr_image: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
    pub fn new(template: &'a [u8], values: &'a PlaceholderValues) -> Self {
        Self {
            template,
            values,
            qr_image: None,
        }
    }

    pub fn with_qr_image(mut self, payload: &'a str) -> Self {
        self.qr_image = Some(payload);
        self
    }
}

/// A rendered certificate and what happened while producing it
#[derive(Debug, Clone)]
pub struct RenderedCertificate {
    /// DOCX bytes
    pub data: Vec<u8>,
    pub size_bytes: usize,
    /// `None` when no QR image was supplied
    pub qr_placement: Option<QrPlacement>,
    /// Placeholders left as text because no value was mapped
    pub unmatched: Vec<String>,
    /// Placeholders the repairer could not rejoin
    pub unresolved: Vec<String>,
}

/// Fills certificate templates
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
    repairer: Repairer,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a renderer with custom options
    pub fn with_options(options: RenderOptions) -> TemplateResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            repairer: Repairer::new(),
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render one certificate.
    ///
    /// Fails when the template is not a DOCX, has no main document part,
    /// already contains the QR marker, holds a malformed tag or the QR payload
    /// cannot be decoded. Unmapped placeholders are not errors.
    pub fn render(&self, ctx: &RenderContext<'_>) -> TemplateResult<RenderedCertificate> {
        let mut package = DocxPackage::from_bytes(ctx.template)?;
        let main = package.main_document_path()?;
        let original = package.read_xml(&main)?;

        if original.contains(&self.options.qr_marker) {
            return Err(TemplateRenderError::MarkerCollision(self.options.qr_marker.clone()));
        }

        let substituter = Substituter::new(self.options.linebreaks);
        let injector = QrInjector::new(&self.options);
        let mut substitution = SubstitutionReport::default();
        let mut unresolved: Vec<String> = Vec::new();

        let repaired = self.repairer.repair(&original);
        extend_unique(&mut unresolved, repaired.report.unresolved);
        let mut body = repaired.xml;
        if ctx.qr_image.is_some() {
            body = injector.mark_placeholders(&body);
        }
        let (body, report) = substituter.substitute(&main, &body, ctx.values)?;
        substitution.merge(report);

        for part in package.header_footer_parts(&main)? {
            let xml = package.read_xml(&part)?;
            let repaired = self.repairer.repair(&xml);
            extend_unique(&mut unresolved, repaired.report.unresolved);
            let (xml, report) = substituter.substitute(&part, &repaired.xml, ctx.values)?;
            substitution.merge(report);
            package.write_xml(&part, xml);
        }

        let (body, qr_placement) = match ctx.qr_image {
            Some(payload) => {
                let image = QrImage::from_payload(payload)?;
                let rel_id = self.embed_image(&mut package, &main, image)?;
                let (body, placement) = injector.inject(&body, &rel_id)?;
                (body, Some(placement))
            }
            None => (body, None),
        };
        package.write_xml(&main, body);

        let data = package.to_bytes()?;
        tracing::debug!(
            "Rendered certificate: {} bytes, {} values substituted, {} unmatched",
            data.len(),
            substitution.replaced,
            substitution.unmatched.len()
        );

        Ok(RenderedCertificate {
            size_bytes: data.len(),
            data,
            qr_placement,
            unmatched: substitution.unmatched,
            unresolved,
        })
    }

    /// Store the QR media part and register it with the main part.
    ///
    /// The configured relationship id and media name are reused when they
    /// already hold this renderer's image, as in a re-rendered certificate.
    /// When the template uses either for something else a numbered variant
    /// is taken instead. Returns the relationship id the drawing must reference.
    fn embed_image(&self, package: &mut DocxPackage, main: &str, image: QrImage) -> TemplateResult<String> {
        let mut content_types = package.content_types()?;
        if content_types.ensure_default(&image.extension, &image.content_type) {
            package.write_content_types(&content_types);
        }

        let mut rels = package.relationships(main)?;
        let mut n = 1u32;
        let (rel_id, target, media_path, reused) = loop {
            let suffix = if n == 1 { String::new() } else { n.to_string() };
            let rel_id = format!("{}{}", self.options.qr_relationship_id, suffix);
            let file_name = format!("{}{}.{}", self.options.qr_media_name, suffix, image.extension);
            let target = format!("media/{}", file_name);
            let media_path = format!("{}media/{}", part_dir(main), file_name);

            match rels.get(&rel_id) {
                Some(rel) if rel.rel_type == relationship_types::IMAGE && rel.target == target => {
                    break (rel_id, target, media_path, true);
                }
                Some(_) => {}
                None if package.contains(&media_path) => {}
                None => break (rel_id, target, media_path, false),
            }
            n += 1;
        };

        if reused {
            tracing::warn!("Relationship {} already present in {}, not adding it again", rel_id, main);
        } else {
            rels.insert_with_id(&rel_id, relationship_types::IMAGE, &target);
            package.write_relationships(main, &rels);
        }
        if n > 1 {
            tracing::warn!("Template already uses the QR id or media name, embedding as {}", rel_id);
        }
        package.put(&media_path, image.data);
        Ok(rel_id)
    }
}

fn extend_unique(into: &mut Vec<String>, names: Vec<String>) {
    for name in names {
        if !into.contains(&name) {
            into.push(name);
        }
    }
}

/// Placeholder names of a template, after repair.
///
/// Body names come first, then those only found in headers and footers.
pub fn extract_from_docx(template: &[u8]) -> TemplateResult<Vec<String>> {
    let package = DocxPackage::from_bytes(template)?;
    let main = package.main_document_path()?;
    let repairer = Repairer::new();

    let mut names = extract_placeholders(&repairer.repair(&package.read_xml(&main)?).xml);
    for part in package.header_footer_parts(&main)? {
        let found = extract_placeholders(&repairer.repair(&package.read_xml(&part)?).xml);
        extend_unique(&mut names, found);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn template(body: &str) -> Vec<u8> {
        let document = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn values(pairs: &[(&str, &str)]) -> PlaceholderValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_render_without_placeholders_is_pass_through() {
        let bytes = template("<w:p><w:r><w:t>Certificate</w:t></w:r></w:p>");
        let map = PlaceholderValues::new();
        let rendered = Renderer::new().render(&RenderContext::new(&bytes, &map)).unwrap();

        let package = DocxPackage::from_bytes(&rendered.data).unwrap();
        assert!(package.read_xml("word/document.xml").unwrap().contains("<w:t>Certificate</w:t>"));
        assert_eq!(rendered.size_bytes, rendered.data.len());
        assert!(rendered.qr_placement.is_none());
    }

    #[test]
    fn test_marker_collision_fails_fast() {
        let bytes = template("<w:p><w:r><w:t>[[QR_INLINE_IMG]]</w:t></w:r></w:p>");
        let map = PlaceholderValues::new();
        let err = Renderer::new().render(&RenderContext::new(&bytes, &map)).unwrap_err();
        assert!(matches!(err, TemplateRenderError::MarkerCollision(_)));
    }

    #[test]
    fn test_custom_marker_avoids_collision() {
        let bytes = template("<w:p><w:r><w:t>[[QR_INLINE_IMG]] {{QRCode}}</w:t></w:r></w:p>");
        let map = PlaceholderValues::new();
        let renderer = Renderer::with_options(RenderOptions {
            qr_marker: "@@QR-7f3a@@".into(),
            ..Default::default()
        })
        .unwrap();
        let ctx = RenderContext::new(&bytes, &map).with_qr_image("iVBORw0KGgo=");
        let rendered = renderer.render(&ctx).unwrap();
        assert!(matches!(rendered.qr_placement, Some(QrPlacement::Inline { count: 1, .. })));
    }

    #[test]
    fn test_not_a_docx() {
        let map = PlaceholderValues::new();
        let err = Renderer::new().render(&RenderContext::new(b"not a zip", &map)).unwrap_err();
        assert!(matches!(err, TemplateRenderError::Archive(_)));
    }

    #[test]
    fn test_qr_placeholder_without_payload_is_ordinary() {
        let bytes = template("<w:p><w:r><w:t>{{QRCode}}</w:t></w:r></w:p>");
        let map = values(&[("QRCode", "see attached")]);
        let rendered = Renderer::new().render(&RenderContext::new(&bytes, &map)).unwrap();
        let package = DocxPackage::from_bytes(&rendered.data).unwrap();
        assert!(package.read_xml("word/document.xml").unwrap().contains("<w:t>see attached</w:t>"));
    }

    #[test]
    fn test_extract_from_docx_repairs_first() {
        let bytes = template("<w:p><w:r><w:t>{{Na</w:t></w:r><w:r><w:t>me}} {{Course}}</w:t></w:r></w:p>");
        assert_eq!(extract_from_docx(&bytes).unwrap(), vec!["Name", "Course"]);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = RenderOptions {
            qr_relationship_id: "rId 1".into(),
            ..Default::default()
        };
        assert!(Renderer::with_options(options).is_err());
    }
}
