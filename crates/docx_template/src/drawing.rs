//! DrawingML fragments for embedded images
//!
//! Generates the `w:drawing` markup for the QR image, either inline in a run
//! or anchored to the page, and keeps the surrounding document consistent:
//! unique `wp:docPr` ids, declared namespaces, page geometry.

use crate::namespaces;
use crate::options::AnchorCorner;
use crate::reader::escape_xml;
use regex_lite::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// EMUs per inch
pub const EMU_PER_INCH: i64 = 914_400;
/// EMUs per twentieth of a point
pub const EMU_PER_TWIP: i64 = 635;

/// A4 portrait in twips, used when the body declares no page size
const DEFAULT_PAGE_TWIPS: (i64, i64) = (11_906, 16_838);

fn doc_pr_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<wp:docPr\s(?:[^>]*\s)?id="(\d+)""#).expect("invalid regex"))
}

fn page_size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<w:pgSz\s[^>]*>").expect("invalid regex"))
}

/// Byte range of the body-level `w:sectPr`, up to `</w:body>`.
///
/// It is the last child of the body, so it opens after the final paragraph
/// or table. Tracked `w:sectPrChange` history nests inside it.
pub(crate) fn body_section(xml: &str) -> Option<Range<usize>> {
    let body_close = xml.rfind("</w:body>")?;
    let content_end = ["</w:p>", "</w:tbl>"]
        .iter()
        .filter_map(|tag| xml[..body_close].rfind(tag).map(|i| i + tag.len()))
        .max()
        .unwrap_or(0);
    let tail = &xml[content_end..body_close];
    let open = tail.match_indices("<w:sectPr").find_map(|(i, _)| {
        match tail[i + "<w:sectPr".len()..].chars().next() {
            Some('>') | Some('/') => Some(i),
            Some(c) if c.is_whitespace() => Some(i),
            _ => None,
        }
    })?;
    Some(content_end + open..body_close)
}

pub fn twips_to_emu(twips: i64) -> i64 {
    twips * EMU_PER_TWIP
}

/// Allocator for `wp:docPr` ids.
///
/// Word rejects documents where two drawings share an id, so new drawings
/// continue after the highest id already present.
#[derive(Debug, Clone)]
pub struct DrawingIds {
    next: u32,
}

impl DrawingIds {
    /// Start after the highest id found in `xml`
    pub fn scan(xml: &str) -> Self {
        let max = doc_pr_id_regex()
            .captures_iter(xml)
            .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Self { next: max + 1 }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Page dimensions in EMU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize {
    pub width_emu: i64,
    pub height_emu: i64,
}

impl PageSize {
    /// Page size of the final section, read from the body-level `w:sectPr`
    pub fn from_body(xml: &str) -> Self {
        let section = body_section(xml).map(|range| &xml[range]).unwrap_or("");
        // the previous properties recorded by a tracked change come last
        let current = match section.find("<w:sectPrChange") {
            Some(at) => &section[..at],
            None => section,
        };
        let (w, h) = page_size_regex()
            .find(current)
            .map(|m| {
                let tag = m.as_str();
                (
                    twips_attr(tag, "w:w").unwrap_or(DEFAULT_PAGE_TWIPS.0),
                    twips_attr(tag, "w:h").unwrap_or(DEFAULT_PAGE_TWIPS.1),
                )
            })
            .unwrap_or(DEFAULT_PAGE_TWIPS);
        Self {
            width_emu: twips_to_emu(w),
            height_emu: twips_to_emu(h),
        }
    }

    /// Top-left offset of a square image of `size` placed in `corner`
    pub fn corner_offset(&self, corner: AnchorCorner, size: i64, margin: i64) -> (i64, i64) {
        let x = if corner.is_right() {
            self.width_emu - margin - size
        } else {
            margin
        };
        let y = if corner.is_bottom() {
            self.height_emu - margin - size
        } else {
            margin
        };
        (x.max(0), y.max(0))
    }
}

fn twips_attr(tag: &str, name: &str) -> Option<i64> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = start + tag[start..].find('"')?;
    tag[start..end].trim().parse().ok()
}

/// Image description shared by inline and anchored drawings
#[derive(Debug, Clone)]
pub struct DrawingSpec<'a> {
    pub rel_id: &'a str,
    pub name: &'a str,
    pub size_emu: i64,
}

fn graphic(spec: &DrawingSpec<'_>, id: u32) -> String {
    format!(
        concat!(
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{a}" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="{a}"><a:graphicData uri="{pic}">"#,
            r#"<pic:pic xmlns:pic="{pic}"><pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cx}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
            r#"</a:graphicData></a:graphic>"#
        ),
        a = namespaces::A,
        pic = namespaces::PIC,
        id = id,
        name = escape_xml(spec.name),
        rel = escape_xml(spec.rel_id),
        cx = spec.size_emu,
    )
}

/// Generate a `w:drawing` element that flows with the text
pub fn inline_drawing(spec: &DrawingSpec<'_>, id: u32) -> String {
    format!(
        concat!(
            r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cx}"/><wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
            r#"<wp:docPr id="{id}" name="{name} {id}"/>{graphic}</wp:inline></w:drawing>"#
        ),
        cx = spec.size_emu,
        id = id,
        name = escape_xml(spec.name),
        graphic = graphic(spec, id),
    )
}

/// Generate a `w:drawing` element floating at a fixed page offset
pub fn anchored_drawing(spec: &DrawingSpec<'_>, id: u32, offset: (i64, i64)) -> String {
    format!(
        concat!(
            r#"<w:drawing><wp:anchor distT="0" distB="0" distL="0" distR="0" simplePos="0" "#,
            r#"relativeHeight="251659264" behindDoc="0" locked="0" layoutInCell="1" allowOverlap="1">"#,
            r#"<wp:simplePos x="0" y="0"/>"#,
            r#"<wp:positionH relativeFrom="page"><wp:posOffset>{x}</wp:posOffset></wp:positionH>"#,
            r#"<wp:positionV relativeFrom="page"><wp:posOffset>{y}</wp:posOffset></wp:positionV>"#,
            r#"<wp:extent cx="{cx}" cy="{cx}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:wrapNone/>"#,
            r#"<wp:docPr id="{id}" name="{name} {id}"/>{graphic}</wp:anchor></w:drawing>"#
        ),
        x = offset.0,
        y = offset.1,
        cx = spec.size_emu,
        id = id,
        name = escape_xml(spec.name),
        graphic = graphic(spec, id),
    )
}

/// Declare the `wp` and `r` prefixes on the root element when missing
pub fn ensure_drawing_namespaces(xml: &str) -> String {
    let Some((start, end)) = root_start_tag(xml) else {
        return xml.to_string();
    };
    let tag = &xml[start..end];
    let mut extra = String::new();
    for (prefix, uri) in [("wp", namespaces::WP), ("r", namespaces::R)] {
        if !tag.contains(&format!("xmlns:{}=", prefix)) {
            extra.push_str(&format!(r#" xmlns:{}="{}""#, prefix, uri));
        }
    }
    if extra.is_empty() {
        return xml.to_string();
    }

    let insert_at = if tag.ends_with("/>") { end - 2 } else { end - 1 };
    let mut out = String::with_capacity(xml.len() + extra.len());
    out.push_str(&xml[..insert_at]);
    out.push_str(&extra);
    out.push_str(&xml[insert_at..]);
    out
}

/// Byte range of the first element start tag, skipping the prolog and comments
fn root_start_tag(xml: &str) -> Option<(usize, usize)> {
    let mut pos = 0;
    while let Some(offset) = xml[pos..].find('<') {
        let start = pos + offset;
        let rest = &xml[start..];
        if rest.starts_with("<?") || rest.starts_with("<!") {
            pos = start + rest.find('>')? + 1;
            continue;
        }
        let end = start + rest.find('>')? + 1;
        return Some((start, end));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> DrawingSpec<'static> {
        DrawingSpec {
            rel_id: "rIdQrCode",
            name: "QR Code",
            size_emu: EMU_PER_INCH,
        }
    }

    #[test]
    fn test_twips_to_emu() {
        // 1440 twips = 1 inch
        assert_eq!(twips_to_emu(1440), EMU_PER_INCH);
    }

    #[test]
    fn test_drawing_ids_continue_after_existing() {
        let xml = r#"<wp:docPr id="3" name="Picture 3"/><wp:docPr name="x" id="12"/>"#;
        let mut ids = DrawingIds::scan(xml);
        assert_eq!(ids.next_id(), 13);
        assert_eq!(ids.next_id(), 14);
        assert_eq!(DrawingIds::scan("<w:body/>").next_id(), 1);
    }

    #[test]
    fn test_page_size_defaults_to_a4() {
        let page = PageSize::from_body("<w:body><w:p/></w:body>");
        assert_eq!(page.width_emu, 11906 * 635);
        assert_eq!(page.height_emu, 16838 * 635);
    }

    #[test]
    fn test_page_size_uses_last_section() {
        let xml = r#"<w:body><w:p><w:pPr><w:sectPr><w:pgSz w:w="100" w:h="200"/></w:sectPr></w:pPr></w:p><w:sectPr><w:pgSz w:w="16838" w:h="11906" w:orient="landscape"/></w:sectPr></w:body>"#;
        let page = PageSize::from_body(xml);
        assert_eq!(page.width_emu, twips_to_emu(16838));
        assert_eq!(page.height_emu, twips_to_emu(11906));
    }

    #[test]
    fn test_page_size_ignores_tracked_section_change() {
        let xml = r#"<w:body><w:p/><w:sectPr w:rsidR="00A1"><w:pgSz w:w="16838" w:h="11906"/><w:sectPrChange w:id="1" w:author="a"><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:sectPrChange></w:sectPr></w:body>"#;
        let page = PageSize::from_body(xml);
        assert_eq!(page.width_emu, twips_to_emu(16838));

        let section = body_section(xml).unwrap();
        assert!(xml[section].starts_with(r#"<w:sectPr w:rsidR="00A1">"#));
        assert_eq!(body_section("<w:body><w:p/></w:body>"), None);
    }

    #[test]
    fn test_corner_offsets() {
        let page = PageSize { width_emu: 10_000, height_emu: 20_000 };
        assert_eq!(page.corner_offset(AnchorCorner::TopLeft, 1_000, 500), (500, 500));
        assert_eq!(page.corner_offset(AnchorCorner::BottomRight, 1_000, 500), (8_500, 18_500));
        assert_eq!(page.corner_offset(AnchorCorner::TopRight, 20_000, 0), (0, 0));
    }

    #[test]
    fn test_inline_drawing_references_relationship() {
        let xml = inline_drawing(&spec(), 7);
        assert!(xml.starts_with("<w:drawing><wp:inline"));
        assert!(xml.contains(r#"r:embed="rIdQrCode""#));
        assert!(xml.contains(r#"<wp:docPr id="7""#));
        assert!(xml.contains(r#"cx="914400" cy="914400""#));
    }

    #[test]
    fn test_anchored_drawing_is_page_relative() {
        let xml = anchored_drawing(&spec(), 2, (100, 200));
        assert!(xml.contains("<wp:anchor"));
        assert!(xml.contains(r#"<wp:positionH relativeFrom="page"><wp:posOffset>100</wp:posOffset>"#));
        assert!(xml.contains(r#"<wp:positionV relativeFrom="page"><wp:posOffset>200</wp:posOffset>"#));
        assert!(xml.contains("<wp:wrapNone/>"));
    }

    #[test]
    fn test_ensure_namespaces_adds_missing_only() {
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="{}" xmlns:r="{}"><w:body/></w:document>"#,
            namespaces::W,
            namespaces::R
        );
        let out = ensure_drawing_namespaces(&xml);
        assert!(out.contains(&format!(r#"xmlns:wp="{}""#, namespaces::WP)));
        assert_eq!(out.matches("xmlns:r=").count(), 1);
        assert_eq!(ensure_drawing_namespaces(&out), out);
    }
}
