//! Placeholder repair
//!
//! Word's proofing and autocorrect machinery splits typed text into several
//! runs whenever it marks a word or re-applies formatting, so `{{AadharNo}}`
//! can reach us as `{{A` / `adhar` / `No}}` in three `w:t` elements. The
//! repairer moves every such token back into the text node where it starts.
//!
//! Repair only joins nodes of one paragraph whose separating markup carries no
//! content of its own (run boundaries, run properties, proofing marks,
//! bookmarks). Breaks, drawings, fields and tabs inside a token are left alone
//! and the token is reported as unresolved.

use crate::placeholder::placeholder_pattern;
use crate::text_nodes::{consolidate, node_at, open_tag, text_element, virtual_text, Edits, Gap, Scan};
use regex_lite::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn leading_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{\{\s*[A-Za-z0-9_]+\s*\}\}").expect("invalid regex"))
}

fn trailing_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*[A-Za-z0-9_]+\s*\}\}$").expect("invalid regex"))
}

/// Kind of fragmentation a repair undid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairPass {
    /// Fragments separated by spelling/grammar `w:proofErr` marks
    ProofingSplit,
    /// Token split over two runs
    TwoRunSplit,
    /// Token split over three runs
    ThreeRunSplit,
    /// Token split over four or more runs
    GenericSplit,
    /// Two complete tokens glued by a tab or a run boundary
    GluedPair,
    /// A split only joinable after an earlier round changed the paragraph
    CatchAll,
}

impl RepairPass {
    pub const ALL: [RepairPass; 6] = [
        RepairPass::ProofingSplit,
        RepairPass::TwoRunSplit,
        RepairPass::ThreeRunSplit,
        RepairPass::GenericSplit,
        RepairPass::GluedPair,
        RepairPass::CatchAll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RepairPass::ProofingSplit => "proofing_split",
            RepairPass::TwoRunSplit => "two_run_split",
            RepairPass::ThreeRunSplit => "three_run_split",
            RepairPass::GenericSplit => "generic_split",
            RepairPass::GluedPair => "glued_pair",
            RepairPass::CatchAll => "catch_all",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// What a repair changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    counts: [usize; 6],
    /// Placeholder names still spread over several text nodes
    pub unresolved: Vec<String>,
}

impl RepairReport {
    /// Number of repairs of one kind
    pub fn count(&self, pass: RepairPass) -> usize {
        self.counts[pass.index()]
    }

    /// Number of repairs of every kind
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    fn record(&mut self, pass: RepairPass) {
        self.counts[pass.index()] += 1;
    }
}

/// Repaired part XML with its report
#[derive(Debug, Clone)]
pub struct Repaired {
    pub xml: String,
    pub report: RepairReport,
}

/// Rejoins placeholder tokens split across runs
#[derive(Debug, Clone)]
pub struct Repairer {
    max_rounds: usize,
}

impl Default for Repairer {
    fn default() -> Self {
        Self { max_rounds: 16 }
    }
}

impl Repairer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repair one part.
    ///
    /// Rounds run until the XML stops changing, so repairing the output again
    /// returns it byte-for-byte.
    pub fn repair(&self, xml: &str) -> Repaired {
        let mut report = RepairReport::default();
        let mut current = xml.to_string();

        let mut converged = false;
        for round in 0..self.max_rounds {
            match repair_round(&current, round == 0, &mut report) {
                Some(next) => current = next,
                None => {
                    converged = true;
                    break;
                }
            }
        }
        if !converged {
            tracing::warn!("Placeholder repair did not settle after {} rounds", self.max_rounds);
        }

        report.unresolved = unresolved_tokens(&current);
        for name in &report.unresolved {
            tracing::warn!("Placeholder {{{{{}}}}} is still split by content markup and will be left as text", name);
        }
        if report.total() > 0 {
            tracing::debug!(
                "Repaired {} split placeholders ({} proofing, {} two-run, {} three-run, {} generic, {} glued, {} catch-all)",
                report.total(),
                report.count(RepairPass::ProofingSplit),
                report.count(RepairPass::TwoRunSplit),
                report.count(RepairPass::ThreeRunSplit),
                report.count(RepairPass::GenericSplit),
                report.count(RepairPass::GluedPair),
                report.count(RepairPass::CatchAll),
            );
        }

        Repaired { xml: current, report }
    }
}

/// Repair with default settings and return only the XML
pub fn repair_xml(xml: &str) -> String {
    Repairer::new().repair(xml).xml
}

fn placeholder_ranges(text: &str) -> Vec<Range<usize>> {
    placeholder_pattern().find_iter(text).map(|m| m.range()).collect()
}

/// One round over every paragraph; `None` when nothing changed
fn repair_round(xml: &str, first_round: bool, report: &mut RepairReport) -> Option<String> {
    let scan = Scan::new(xml);
    let mut texts: Vec<String> = (0..scan.nodes.len()).map(|i| scan.text(xml, i).to_string()).collect();
    let mut edits = Edits::new();

    for paragraph in 0..scan.paragraphs.len() {
        for segment in scan.segments(xml, paragraph, false) {
            if segment.len() < 2 {
                continue;
            }
            let mut seg_texts: Vec<String> = segment.iter().map(|&n| texts[n].clone()).collect();
            for (first, last, token) in consolidate(&mut seg_texts, placeholder_ranges) {
                let pass = if first_round {
                    classify_split(&scan, xml, &segment[first..=last])
                } else {
                    RepairPass::CatchAll
                };
                tracing::debug!("Rejoined {} ({})", token, pass.name());
                report.record(pass);
            }
            for (&node, text) in segment.iter().zip(seg_texts) {
                texts[node] = text;
            }
        }

        glue_adjacent_tokens(&scan, xml, paragraph, &mut texts, &mut edits, report);
    }

    for (i, node) in scan.nodes.iter().enumerate() {
        if texts[i] != scan.text(xml, i) {
            edits.replace(node.element.clone(), text_element(open_tag(xml, node), &texts[i]));
        }
    }

    if edits.is_empty() {
        None
    } else {
        Some(edits.apply(xml))
    }
}

fn classify_split(scan: &Scan, xml: &str, nodes: &[usize]) -> RepairPass {
    let proofing = nodes
        .windows(2)
        .any(|w| scan.between(xml, w[0], w[1]).contains("<w:proofErr"));
    if proofing {
        return RepairPass::ProofingSplit;
    }
    match nodes.len() {
        2 => RepairPass::TwoRunSplit,
        3 => RepairPass::ThreeRunSplit,
        _ => RepairPass::GenericSplit,
    }
}

/// `{{a}}` / tab / `{{b}}` in neighbouring runs becomes `{{a}} {{b}}` in the
/// first node; the tab is dropped.
fn glue_adjacent_tokens(
    scan: &Scan,
    xml: &str,
    paragraph: usize,
    texts: &mut [String],
    edits: &mut Edits,
    report: &mut RepairReport,
) {
    let mut prev: Option<usize> = None;
    for &node in &scan.paragraphs[paragraph].nodes {
        if texts[node].is_empty() {
            continue;
        }
        if let Some(target) = prev {
            let range = scan.nodes[target].element.end..scan.nodes[node].element.start;
            let between = &xml[range.clone()];
            let gap = Gap::classify(between);
            let glued = match gap {
                Gap::Hard => false,
                Gap::Tab => true,
                Gap::Soft => between.contains("</w:r>"),
            };
            if glued
                && trailing_token_regex().is_match(&texts[target])
                && leading_token_regex().is_match(&texts[node])
            {
                let moved = std::mem::take(&mut texts[node]);
                texts[target].push(' ');
                texts[target].push_str(&moved);
                edits.remove_tabs(xml, range);
                report.record(RepairPass::GluedPair);
                continue;
            }
        }
        prev = Some(node);
    }
}

/// Names of tokens whose characters still live in more than one node
fn unresolved_tokens(xml: &str) -> Vec<String> {
    let scan = Scan::new(xml);
    let mut names: Vec<String> = Vec::new();
    for paragraph in &scan.paragraphs {
        if paragraph.nodes.len() < 2 {
            continue;
        }
        let texts: Vec<String> = paragraph.nodes.iter().map(|&n| scan.text(xml, n).to_string()).collect();
        let (joined, starts) = virtual_text(&texts);
        for caps in placeholder_pattern().captures_iter(&joined) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { continue };
            let first = node_at(&texts, &starts, whole.start());
            let last = node_at(&texts, &starts, whole.end() - 1);
            if first != last && !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }
    names
}
