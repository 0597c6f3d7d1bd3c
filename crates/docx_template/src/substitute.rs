//! Value substitution inside text nodes

use crate::error::{TemplateRenderError, TemplateResult};
use crate::placeholder::placeholder_pattern;
use crate::reader::escape_xml;
use crate::text_nodes::{open_tag, text_element, Edits, Scan};
use std::collections::HashMap;

/// Closes the current text element, breaks the line and reopens the text
const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;

/// Outcome of substituting one or more parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    /// Number of tokens replaced with a value
    pub replaced: usize,
    /// Distinct names left as literal text because no value was mapped
    pub unmatched: Vec<String>,
}

impl SubstitutionReport {
    pub fn merge(&mut self, other: SubstitutionReport) {
        self.replaced += other.replaced;
        for name in other.unmatched {
            if !self.unmatched.contains(&name) {
                self.unmatched.push(name);
            }
        }
    }
}

/// Replaces `{{name}}` tokens with mapped values
#[derive(Debug, Clone)]
pub struct Substituter {
    linebreaks: bool,
}

impl Default for Substituter {
    fn default() -> Self {
        Self { linebreaks: true }
    }
}

impl Substituter {
    pub fn new(linebreaks: bool) -> Self {
        Self { linebreaks }
    }

    /// Substitute every contiguous token in the text nodes of `xml`.
    ///
    /// `part` names the package part in diagnostics. Unknown names are kept
    /// verbatim; an empty `{{}}` or a `{{` reopened before its `}}` fails the
    /// whole part.
    pub fn substitute(
        &self,
        part: &str,
        xml: &str,
        values: &HashMap<String, String>,
    ) -> TemplateResult<(String, SubstitutionReport)> {
        let scan = Scan::new(xml);
        let mut report = SubstitutionReport::default();
        let mut edits = Edits::new();

        for node in &scan.nodes {
            let text = &xml[node.content.clone()];
            if !text.contains("{{") {
                continue;
            }
            check_syntax(part, text)?;

            let mut out = String::with_capacity(text.len());
            let mut last = 0;
            let mut multiline = false;
            for caps in placeholder_pattern().captures_iter(text) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { continue };
                let Some(value) = values.get(name.as_str()) else {
                    if !report.unmatched.iter().any(|n| n == name.as_str()) {
                        tracing::warn!("No value for placeholder {} in {}, leaving it as text", whole.as_str(), part);
                        report.unmatched.push(name.as_str().to_string());
                    }
                    continue;
                };
                out.push_str(&text[last..whole.start()]);
                let escaped = self.render_value(value);
                multiline |= escaped.contains(LINE_BREAK);
                out.push_str(&escaped);
                last = whole.end();
                report.replaced += 1;
            }
            if last == 0 {
                continue;
            }
            out.push_str(&text[last..]);

            let open = if multiline {
                r#"<w:t xml:space="preserve">"#
            } else {
                open_tag(xml, node)
            };
            edits.replace(node.element.clone(), text_element(open, &out));
        }

        Ok((edits.apply(xml), report))
    }

    fn render_value(&self, value: &str) -> String {
        if !self.linebreaks {
            return escape_xml(value);
        }
        value
            .replace("\r\n", "\n")
            .split('\n')
            .map(escape_xml)
            .collect::<Vec<_>>()
            .join(LINE_BREAK)
    }
}

/// Reject tokens no substitution can make sense of
fn check_syntax(part: &str, text: &str) -> TemplateResult<()> {
    let bytes = text.as_bytes();
    let mut open: Option<usize> = None;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'{', b'{') => {
                if let Some(start) = open {
                    return Err(TemplateRenderError::Syntax {
                        part: part.to_string(),
                        message: format!("unclosed tag {:?} opened again", excerpt(&text[start..])),
                    });
                }
                open = Some(i);
                i += 2;
            }
            (b'}', b'}') => {
                if let Some(start) = open.take() {
                    if text[start + 2..i].trim().is_empty() {
                        return Err(TemplateRenderError::Syntax {
                            part: part.to_string(),
                            message: format!("empty tag {:?}", &text[start..i + 2]),
                        });
                    }
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

fn excerpt(text: &str) -> String {
    text.chars().take(24).collect()
}
