//! Paragraph-scoped view of `w:t` text nodes
//!
//! Works on the serialized part XML: every `w:t` element is located by byte
//! range and assigned to its innermost enclosing `w:p`. The markup between two
//! consecutive nodes of a paragraph decides whether their text may be joined.

use regex_lite::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn structure_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<w:p(?:\s[^>]*)?/?>|</w:p>|<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("invalid regex")
    })
}

fn hard_boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"<w:(?:p|br|cr|drawing|pict|object|sym|fldChar|instrText|fldSimple|footnoteReference|",
            r"endnoteReference|commentReference|del|tbl|tc|tr|sdt|txbxContent|noBreakHyphen|softHyphen|ptab)[\s/>]",
            r"|</w:(?:p|sdt|del|fldSimple)>"
        ))
        .expect("invalid regex")
    })
}

fn tab_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<w:tab(?:\s[^>]*)?/>").expect("invalid regex"))
}

/// A `w:t` element located in the part XML
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextNode {
    /// Whole element, `<w:t ...>` through `</w:t>`
    pub element: Range<usize>,
    /// Escaped character data between the tags
    pub content: Range<usize>,
    /// Index into [`Scan::paragraphs`]; `None` outside any paragraph
    pub paragraph: Option<usize>,
}

/// A `w:p` element located in the part XML
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Paragraph {
    /// Byte offset just past the opening tag
    pub open_end: usize,
    /// Text node indices, in document order
    pub nodes: Vec<usize>,
}

/// What separates two consecutive text nodes of one paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gap {
    /// Only run boundaries, properties, proofing marks or bookmarks
    Soft,
    /// A tab character, otherwise soft
    Tab,
    /// Content-bearing markup: breaks, drawings, fields, nested structure
    Hard,
}

impl Gap {
    pub fn classify(between: &str) -> Self {
        if hard_boundary_regex().is_match(between) {
            Gap::Hard
        } else if tab_regex().is_match(between) {
            Gap::Tab
        } else {
            Gap::Soft
        }
    }

    pub fn joins(self, across_tabs: bool) -> bool {
        match self {
            Gap::Soft => true,
            Gap::Tab => across_tabs,
            Gap::Hard => false,
        }
    }
}

/// All text nodes and paragraphs of one part
#[derive(Debug, Clone)]
pub(crate) struct Scan {
    pub nodes: Vec<TextNode>,
    pub paragraphs: Vec<Paragraph>,
}

impl Scan {
    pub fn new(xml: &str) -> Self {
        let mut nodes = Vec::new();
        let mut paragraphs: Vec<Paragraph> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        for caps in structure_regex().captures_iter(xml) {
            let Some(whole) = caps.get(0) else { continue };
            if let Some(text) = caps.get(1) {
                let paragraph = open.last().copied();
                let index = nodes.len();
                nodes.push(TextNode {
                    element: whole.range(),
                    content: text.range(),
                    paragraph,
                });
                if let Some(p) = paragraph {
                    paragraphs[p].nodes.push(index);
                }
            } else if whole.as_str() == "</w:p>" {
                open.pop();
            } else {
                paragraphs.push(Paragraph {
                    open_end: whole.end(),
                    nodes: Vec::new(),
                });
                // `<w:p/>` is an empty paragraph that never opens
                if !whole.as_str().ends_with("/>") {
                    open.push(paragraphs.len() - 1);
                }
            }
        }

        Self { nodes, paragraphs }
    }

    pub fn text<'a>(&self, xml: &'a str, node: usize) -> &'a str {
        &xml[self.nodes[node].content.clone()]
    }

    /// Markup between two nodes, `a` before `b`
    pub fn between<'a>(&self, xml: &'a str, a: usize, b: usize) -> &'a str {
        &xml[self.nodes[a].element.end..self.nodes[b].element.start]
    }

    /// Split a paragraph's nodes into runs joined by joinable gaps
    pub fn segments(&self, xml: &str, paragraph: usize, across_tabs: bool) -> Vec<Vec<usize>> {
        let mut segments: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        for &node in &self.paragraphs[paragraph].nodes {
            if let Some(&prev) = current.last() {
                if !Gap::classify(self.between(xml, prev, node)).joins(across_tabs) {
                    segments.push(std::mem::take(&mut current));
                }
            }
            current.push(node);
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

/// Concatenated text of a group of nodes, with each node's start offset
pub(crate) fn virtual_text(texts: &[String]) -> (String, Vec<usize>) {
    let mut joined = String::new();
    let mut starts = Vec::with_capacity(texts.len());
    for text in texts {
        starts.push(joined.len());
        joined.push_str(text);
    }
    (joined, starts)
}

/// Index of the non-empty node holding byte `pos` of the virtual text
pub(crate) fn node_at(texts: &[String], starts: &[usize], pos: usize) -> Option<usize> {
    (0..texts.len()).find(|&i| !texts[i].is_empty() && starts[i] <= pos && pos < starts[i] + texts[i].len())
}

/// Move every match of `find` that spans several nodes of a segment into the
/// node where it starts.
///
/// `texts` holds the node texts of one segment and is updated in place; the
/// virtual text never changes, only which node owns each character.
pub(crate) fn consolidate<F>(texts: &mut [String], find: F) -> Vec<(usize, usize, String)>
where
    F: Fn(&str) -> Vec<Range<usize>>,
{
    let (joined, _) = virtual_text(texts);
    let mut merged = Vec::new();

    for range in find(&joined) {
        if range.is_empty() {
            continue;
        }
        let (_, starts) = virtual_text(texts);
        let (Some(first), Some(last)) = (
            node_at(texts, &starts, range.start),
            node_at(texts, &starts, range.end - 1),
        ) else {
            continue;
        };
        if first == last {
            continue;
        }

        let keep = range.start - starts[first];
        let mut head = texts[first][..keep].to_string();
        head.push_str(&joined[range.clone()]);
        texts[first] = head;
        for text in texts.iter_mut().take(last).skip(first + 1) {
            text.clear();
        }
        let consumed = range.end - starts[last];
        texts[last] = texts[last][consumed..].to_string();

        merged.push((first, last, joined[range].to_string()));
    }

    merged
}

/// Rewrite a `w:t` element with new escaped content.
///
/// `xml:space="preserve"` is added when the text has edge whitespace, since
/// Word would otherwise drop it.
pub(crate) fn text_element(original_open: &str, content: &str) -> String {
    let needs_preserve = content.starts_with(char::is_whitespace) || content.ends_with(char::is_whitespace);
    if needs_preserve && !original_open.contains("xml:space") {
        let tag = original_open.strip_suffix('>').unwrap_or(original_open);
        format!(r#"{} xml:space="preserve">{}</w:t>"#, tag, content)
    } else {
        format!("{}{}</w:t>", original_open, content)
    }
}

/// Opening tag of a node as written in the XML
pub(crate) fn open_tag<'a>(xml: &'a str, node: &TextNode) -> &'a str {
    &xml[node.element.start..node.content.start]
}

/// Pending byte-range replacements, applied back to front
#[derive(Debug, Default)]
pub(crate) struct Edits {
    edits: Vec<(Range<usize>, String)>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, with: String) {
        self.edits.push((range, with));
    }

    pub fn insert(&mut self, at: usize, with: String) {
        self.edits.push((at..at, with));
    }

    /// Remove every `w:tab` element inside `range`
    pub fn remove_tabs(&mut self, xml: &str, range: Range<usize>) {
        let offset = range.start;
        for m in tab_regex().find_iter(&xml[range]) {
            self.edits.push((offset + m.start()..offset + m.end(), String::new()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply all edits; an edit overlapping one already applied is dropped
    pub fn apply(mut self, xml: &str) -> String {
        self.edits.sort_by(|a, b| b.0.start.cmp(&a.0.start).then(b.0.end.cmp(&a.0.end)));
        let mut out = xml.to_string();
        let mut floor = usize::MAX;
        for (range, with) in self.edits {
            if range.end > floor {
                continue;
            }
            floor = range.start;
            out.replace_range(range, &with);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARA: &str = concat!(
        r#"<w:body><w:p w:rsidR="00A1"><w:pPr><w:jc w:val="center"/></w:pPr>"#,
        r#"<w:r><w:t>{{Na</w:t></w:r><w:proofErr w:type="spellStart"/>"#,
        r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">me}} </w:t></w:r>"#,
        r#"<w:r><w:tab/></w:r><w:r><w:t>x</w:t></w:r><w:r><w:br/><w:t>y</w:t></w:r></w:p>"#,
        r#"<w:p/><w:p><w:r><w:t>z</w:t></w:r></w:p></w:body>"#
    );

    #[test]
    fn test_scan_assigns_paragraphs() {
        let scan = Scan::new(PARA);
        assert_eq!(scan.nodes.len(), 5);
        assert_eq!(scan.paragraphs.len(), 3);
        assert_eq!(scan.paragraphs[0].nodes, vec![0, 1, 2, 3]);
        assert!(scan.paragraphs[1].nodes.is_empty());
        assert_eq!(scan.paragraphs[2].nodes, vec![4]);
        assert_eq!(scan.text(PARA, 1), "me}} ");
        assert!(PARA[scan.paragraphs[0].open_end..].starts_with("<w:pPr>"));
    }

    #[test]
    fn test_tab_and_pr_elements_are_not_text() {
        let xml = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t></w:r></w:p>"#;
        let scan = Scan::new(xml);
        assert_eq!(scan.nodes.len(), 1);
        assert_eq!(scan.text(xml, 0), "a");
    }

    #[test]
    fn test_nested_paragraphs() {
        let xml = concat!(
            "<w:p><w:r><w:t>outer</w:t></w:r><w:r><w:pict><w:txbxContent>",
            "<w:p><w:r><w:t>inner</w:t></w:r></w:p>",
            "</w:txbxContent></w:pict></w:r><w:r><w:t>tail</w:t></w:r></w:p>"
        );
        let scan = Scan::new(xml);
        assert_eq!(scan.paragraphs[0].nodes, vec![0, 2]);
        assert_eq!(scan.paragraphs[1].nodes, vec![1]);
        assert_eq!(Gap::classify(scan.between(xml, 0, 2)), Gap::Hard);
    }

    #[test]
    fn test_gap_classification() {
        let scan = Scan::new(PARA);
        assert_eq!(Gap::classify(scan.between(PARA, 0, 1)), Gap::Soft);
        assert_eq!(Gap::classify(scan.between(PARA, 1, 2)), Gap::Tab);
        assert_eq!(Gap::classify(scan.between(PARA, 2, 3)), Gap::Hard);
        assert_eq!(Gap::classify("</w:t></w:r><w:bookmarkStart w:id=\"0\" w:name=\"a\"/><w:r><w:t>"), Gap::Soft);
    }

    #[test]
    fn test_segments() {
        let scan = Scan::new(PARA);
        assert_eq!(scan.segments(PARA, 0, false), vec![vec![0, 1], vec![2], vec![3]]);
        assert_eq!(scan.segments(PARA, 0, true), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_consolidate_moves_token_to_first_node() {
        let mut texts = vec!["Hi {{Fi".to_string(), "rst".to_string(), "Name}}!".to_string()];
        let merged = consolidate(&mut texts, |s| {
            s.find("{{FirstName}}").map(|i| i..i + 13).into_iter().collect()
        });
        assert_eq!(texts, vec!["Hi {{FirstName}}", "", "!"]);
        assert_eq!(merged, vec![(0, 2, "{{FirstName}}".to_string())]);
    }

    #[test]
    fn test_consolidate_skips_contained_tokens() {
        let mut texts = vec!["{{A}}".to_string(), "b".to_string()];
        let merged = consolidate(&mut texts, |_| vec![0..5]);
        assert!(merged.is_empty());
        assert_eq!(texts, vec!["{{A}}", "b"]);
    }

    #[test]
    fn test_text_element_preserves_space() {
        assert_eq!(text_element("<w:t>", " a"), r#"<w:t xml:space="preserve"> a</w:t>"#);
        assert_eq!(text_element("<w:t>", "a"), "<w:t>a</w:t>");
        assert_eq!(
            text_element(r#"<w:t xml:space="preserve">"#, "a "),
            r#"<w:t xml:space="preserve">a </w:t>"#
        );
    }

    #[test]
    fn test_text_element_keeps_other_attributes() {
        assert_eq!(
            text_element(r#"<w:t w14:paraId="1A2B">"#, "a "),
            r#"<w:t w14:paraId="1A2B" xml:space="preserve">a </w:t>"#
        );
    }

    #[test]
    fn test_edits_apply_back_to_front() {
        let mut edits = Edits::new();
        edits.replace(0..1, "AA".into());
        edits.insert(10, "!".into());
        edits.remove_tabs("ab<w:tab/>c", 0..11);
        assert_eq!(edits.apply("ab<w:tab/>c"), "AAb!c");
    }
}
