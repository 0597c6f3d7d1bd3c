//! Placeholder token syntax and extraction

use regex_lite::Regex;
use std::sync::OnceLock;

/// `{{ name }}` with optional inner whitespace; group 1 is the name
pub fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("invalid regex"))
}

/// Check that a name can appear inside `{{...}}`
pub fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Distinct placeholder names in `xml`, in the order they first appear.
///
/// Only contiguous tokens are found; run the repairer first when the
/// template may have been touched by a word processor.
pub fn extract_placeholders(xml: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_pattern().captures_iter(xml) {
        let Some(name) = caps.get(1) else { continue };
        if !names.iter().any(|n| n == name.as_str()) {
            names.push(name.as_str().to_string());
        }
    }
    names
}
