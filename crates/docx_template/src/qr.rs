//! QR image decoding and placement
//!
//! The QR placeholder is swapped for a marker before substitution. Once values
//! are in, the marker is replaced by an inline drawing, trying progressively
//! looser matches. When no inline placement works the image is anchored to a
//! page corner instead, so a certificate never ships without its code.

use crate::drawing::{anchored_drawing, body_section, ensure_drawing_namespaces, inline_drawing, DrawingIds, DrawingSpec, PageSize};
use crate::error::{TemplateRenderError, TemplateResult};
use crate::options::{AnchorCorner, RenderOptions};
use crate::placeholder::placeholder_pattern;
use crate::text_nodes::{consolidate, open_tag, text_element, virtual_text, Edits, Scan};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::ops::Range;

const PRESERVE_OPEN: &str = r#"<w:t xml:space="preserve">"#;

/// Decoded QR raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    pub data: Vec<u8>,
    pub content_type: String,
    /// File extension for the media part, without the dot
    pub extension: String,
}

impl QrImage {
    /// Decode a `data:image/png;base64,...` URL or bare base64 (taken as PNG)
    pub fn from_payload(payload: &str) -> TemplateResult<Self> {
        let payload = payload.trim();
        let (mime, body) = match payload.strip_prefix("data:") {
            Some(rest) => {
                let (header, body) = rest
                    .split_once(',')
                    .ok_or_else(|| TemplateRenderError::InvalidImage("data URL has no ',' separator".into()))?;
                if !header.split(';').any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                    return Err(TemplateRenderError::InvalidImage(
                        "only base64-encoded data URLs are supported".into(),
                    ));
                }
                let mime = header.split(';').next().unwrap_or("").trim();
                (if mime.is_empty() { "image/png" } else { mime }, body)
            }
            None => ("image/png", payload),
        };

        let (content_type, extension) = match mime.to_ascii_lowercase().as_str() {
            "image/png" => ("image/png", "png"),
            "image/jpeg" | "image/jpg" => ("image/jpeg", "jpeg"),
            "image/gif" => ("image/gif", "gif"),
            other => {
                return Err(TemplateRenderError::InvalidImage(format!(
                    "unsupported image type {}",
                    other
                )))
            }
        };

        let cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        let data = STANDARD
            .decode(cleaned)
            .map_err(|e| TemplateRenderError::InvalidImage(e.to_string()))?;
        if data.is_empty() {
            return Err(TemplateRenderError::InvalidImage("payload is empty".into()));
        }

        Ok(Self {
            data,
            content_type: content_type.to_string(),
            extension: extension.to_string(),
        })
    }
}

/// Matching strategy that placed the inline image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementTier {
    /// Marker found whole inside one text node
    Exact,
    /// Marker pieced together from text nodes of one paragraph
    Split,
    /// Marker found in a paragraph's text with content markup in between
    Paragraph,
}

/// Where the QR image ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrPlacement {
    Inline { count: usize, tier: ReplacementTier },
    Anchored { corner: AnchorCorner },
}

/// Places the QR drawing into the main document part
pub(crate) struct QrInjector<'a> {
    options: &'a RenderOptions,
}

impl<'a> QrInjector<'a> {
    pub fn new(options: &'a RenderOptions) -> Self {
        Self { options }
    }

    /// Swap contiguous QR placeholders for the marker
    pub fn mark_placeholders(&self, xml: &str) -> String {
        placeholder_pattern()
            .replace_all(xml, |caps: &regex_lite::Captures<'_>| {
                if &caps[1] == self.options.qr_placeholder {
                    self.options.qr_marker.clone()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Marker and QR placeholder occurrences in `text`, in order
    fn qr_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let marker = &self.options.qr_marker;
        let mut ranges: Vec<Range<usize>> = text
            .match_indices(marker.as_str())
            .map(|(i, m)| i..i + m.len())
            .collect();
        for caps in placeholder_pattern().captures_iter(text) {
            if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
                if name.as_str() == self.options.qr_placeholder {
                    ranges.push(whole.range());
                }
            }
        }
        ranges.sort_by_key(|r| r.start);
        ranges
    }

    fn pending(&self, xml: &str) -> bool {
        if xml.contains(&self.options.qr_marker) {
            return true;
        }
        let scan = Scan::new(xml);
        scan.paragraphs.iter().any(|p| {
            let texts: Vec<String> = p.nodes.iter().map(|&n| scan.text(xml, n).to_string()).collect();
            !self.qr_ranges(&virtual_text(&texts).0).is_empty()
        })
    }

    /// Replace the marker with a drawing of `rel_id`, falling back to a
    /// page-anchored image
    pub fn inject(&self, xml: &str, rel_id: &str) -> TemplateResult<(String, QrPlacement)> {
        let spec = DrawingSpec {
            rel_id,
            name: "QR Code",
            size_emu: self.options.qr_size_emu,
        };
        let mut ids = DrawingIds::scan(xml);
        let mut placed = 0;
        let mut tier = ReplacementTier::Exact;

        let (mut xml, count) = self.replace_exact(xml, &spec, &mut ids);
        placed += count;

        if self.pending(&xml) {
            let (consolidated, merged) = self.consolidate_split(&xml);
            if merged > 0 {
                let (next, count) = self.replace_exact(&consolidated, &spec, &mut ids);
                xml = next;
                if count > 0 {
                    tracing::debug!("Placed {} QR image(s) after joining split marker text", count);
                    placed += count;
                    tier = ReplacementTier::Split;
                }
            }
        }

        if self.pending(&xml) {
            let (next, count) = self.replace_in_paragraphs(&xml, &spec, &mut ids);
            xml = next;
            if count > 0 {
                tracing::debug!("Placed {} QR image(s) at paragraph start", count);
                placed += count;
                tier = ReplacementTier::Paragraph;
            }
        }

        let leftover = self.pending(&xml);
        if leftover {
            xml = self.strip_residual(&xml);
        }

        let placement = if placed == 0 || leftover {
            tracing::warn!(
                "QR marker could not be placed inline, anchoring the image at the {:?} page corner",
                self.options.anchor_corner
            );
            xml = self.anchor(&xml, &spec, &mut ids)?;
            QrPlacement::Anchored {
                corner: self.options.anchor_corner,
            }
        } else {
            QrPlacement::Inline { count: placed, tier }
        };

        Ok((ensure_drawing_namespaces(&xml), placement))
    }

    /// Marker whole inside a text node: split the node around an inline drawing
    fn replace_exact(&self, xml: &str, spec: &DrawingSpec<'_>, ids: &mut DrawingIds) -> (String, usize) {
        let scan = Scan::new(xml);
        let marker = self.options.qr_marker.as_str();
        let mut edits = Edits::new();
        let mut count = 0;

        for node in &scan.nodes {
            let text = &xml[node.content.clone()];
            if !text.contains(marker) {
                continue;
            }
            let mut pieces = text.split(marker);
            let mut out = text_element(open_tag(xml, node), pieces.next().unwrap_or(""));
            for piece in pieces {
                out.push_str(&inline_drawing(spec, ids.next_id()));
                out.push_str(&text_element(PRESERVE_OPEN, piece));
                count += 1;
            }
            edits.replace(node.element.clone(), out);
        }

        (edits.apply(xml), count)
    }

    /// Pull marker fragments split across runs into the node where they start
    fn consolidate_split(&self, xml: &str) -> (String, usize) {
        let scan = Scan::new(xml);
        let mut edits = Edits::new();
        let mut merged = 0;

        for paragraph in 0..scan.paragraphs.len() {
            for segment in scan.segments(xml, paragraph, true) {
                if segment.len() < 2 {
                    continue;
                }
                let mut texts: Vec<String> = segment.iter().map(|&n| scan.text(xml, n).to_string()).collect();
                let joined = consolidate(&mut texts, |s| self.qr_ranges(s));
                if joined.is_empty() {
                    continue;
                }
                merged += joined.len();
                for (&node, text) in segment.iter().zip(&texts) {
                    if text != scan.text(xml, node) {
                        let marked = self.mark_placeholders(text);
                        let node = &scan.nodes[node];
                        edits.replace(node.element.clone(), text_element(open_tag(xml, node), &marked));
                    }
                }
            }
        }

        (edits.apply(xml), merged)
    }

    /// Strip marker characters from the paragraph text and put the drawing in
    /// a run of its own at the start of the paragraph
    fn replace_in_paragraphs(&self, xml: &str, spec: &DrawingSpec<'_>, ids: &mut DrawingIds) -> (String, usize) {
        let scan = Scan::new(xml);
        let mut edits = Edits::new();
        let mut count = 0;

        for paragraph in &scan.paragraphs {
            if paragraph.nodes.is_empty() {
                continue;
            }
            let texts: Vec<String> = paragraph.nodes.iter().map(|&n| scan.text(xml, n).to_string()).collect();
            let (joined, starts) = virtual_text(&texts);
            let ranges = self.qr_ranges(&joined);
            if ranges.is_empty() {
                continue;
            }

            for (k, &node) in paragraph.nodes.iter().enumerate() {
                let kept = strip_ranges(&texts[k], starts[k], &ranges);
                if kept != texts[k] {
                    let node = &scan.nodes[node];
                    edits.replace(node.element.clone(), text_element(open_tag(xml, node), &kept));
                }
            }

            let mut run = String::from("<w:r>");
            for _ in &ranges {
                run.push_str(&inline_drawing(spec, ids.next_id()));
                count += 1;
            }
            run.push_str("</w:r>");
            edits.insert(after_paragraph_properties(xml, paragraph.open_end), run);
        }

        (edits.apply(xml), count)
    }

    fn strip_residual(&self, xml: &str) -> String {
        let without_marker = xml.replace(&self.options.qr_marker, "");
        placeholder_pattern()
            .replace_all(&without_marker, |caps: &regex_lite::Captures<'_>| {
                if &caps[1] == self.options.qr_placeholder {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Append a paragraph holding the anchored drawing to the end of the body
    fn anchor(&self, xml: &str, spec: &DrawingSpec<'_>, ids: &mut DrawingIds) -> TemplateResult<String> {
        let page = PageSize::from_body(xml);
        let offset = page.corner_offset(self.options.anchor_corner, spec.size_emu, self.options.anchor_margin_emu);
        let paragraph = format!("<w:p><w:r>{}</w:r></w:p>", anchored_drawing(spec, ids.next_id(), offset));

        let at = body_end(xml)
            .ok_or_else(|| TemplateRenderError::Xml("main document part has no w:body".into()))?;
        let mut out = String::with_capacity(xml.len() + paragraph.len());
        out.push_str(&xml[..at]);
        out.push_str(&paragraph);
        out.push_str(&xml[at..]);
        Ok(out)
    }
}

/// Keep the parts of a node's text outside `ranges`; `base` is the node's
/// offset in the paragraph text
fn strip_ranges(text: &str, base: usize, ranges: &[Range<usize>]) -> String {
    let end = base + text.len();
    let mut kept = String::new();
    let mut cursor = base;
    for range in ranges {
        if range.end <= cursor || range.start >= end {
            continue;
        }
        if range.start > cursor {
            kept.push_str(&text[cursor - base..range.start - base]);
        }
        cursor = range.end.min(end);
    }
    if cursor < end {
        kept.push_str(&text[cursor - base..]);
    }
    kept
}

/// Insertion point for new runs: after `w:pPr` when the paragraph has one
fn after_paragraph_properties(xml: &str, open_end: usize) -> usize {
    let rest = &xml[open_end..];
    if !rest.starts_with("<w:pPr") {
        return open_end;
    }
    let Some(tag_end) = rest.find('>') else {
        return open_end;
    };
    if rest[..tag_end].ends_with('/') {
        return open_end + tag_end + 1;
    }
    match rest.find("</w:pPr>") {
        Some(close) => open_end + close + "</w:pPr>".len(),
        None => open_end,
    }
}

/// Position before the body-level `w:sectPr`, or before `</w:body>`
fn body_end(xml: &str) -> Option<usize> {
    body_section(xml)
        .map(|section| section.start)
        .or_else(|| xml.rfind("</w:body>"))
}
