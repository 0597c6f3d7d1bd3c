//! Placeholder to column bindings

use std::collections::HashSet;

use docx_template::{placeholder_pattern, PlaceholderValues};
use serde::{Deserialize, Serialize};

use crate::dataset::{DataRow, Dataset};

/// Case change applied to a bound value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTransform {
    Upper,
    Lower,
    Title,
}

impl TextTransform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            TextTransform::Upper => value.to_uppercase(),
            TextTransform::Lower => value.to_lowercase(),
            TextTransform::Title => title_case(value),
        }
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Binds one template placeholder to one dataset column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderBinding {
    pub placeholder: String,
    pub column: String,
    /// Used when the cell is empty or the column is missing
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub transform: Option<TextTransform>,
}

impl PlaceholderBinding {
    pub fn new(placeholder: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            column: column.into(),
            default_value: None,
            transform: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    pub fn with_transform(mut self, transform: TextTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// How a template's placeholders read a row.
///
/// A placeholder without an explicit binding reads the column of the same
/// name. Bindings are serialized as a JSON array so users can keep mapping
/// files next to their templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    bindings: Vec<PlaceholderBinding>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `placeholder` to `column`, replacing any earlier binding for it
    pub fn bind(&mut self, binding: PlaceholderBinding) {
        self.bindings.retain(|b| b.placeholder != binding.placeholder);
        self.bindings.push(binding);
    }

    pub fn with_binding(mut self, binding: PlaceholderBinding) -> Self {
        self.bind(binding);
        self
    }

    pub fn bindings(&self) -> &[PlaceholderBinding] {
        &self.bindings
    }

    pub fn binding(&self, placeholder: &str) -> Option<&PlaceholderBinding> {
        self.bindings.iter().find(|b| b.placeholder == placeholder)
    }

    /// Column a placeholder reads
    pub fn column_for<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.binding(placeholder).map(|b| b.column.as_str()).unwrap_or(placeholder)
    }

    /// Placeholders whose column the dataset lacks and that have no default
    pub fn unbound(&self, placeholders: &[String], dataset: &Dataset) -> Vec<String> {
        placeholders
            .iter()
            .filter(|p| {
                let has_default = self.binding(p).is_some_and(|b| b.default_value.is_some());
                !has_default && !dataset.has_column(self.column_for(p))
            })
            .cloned()
            .collect()
    }

    /// Values for one row.
    ///
    /// Placeholders that resolve to no column and no default are left out so
    /// the renderer keeps them as literal text.
    pub fn resolve(&self, placeholders: &[String], row: &DataRow, trim_values: bool) -> PlaceholderValues {
        let mut values = PlaceholderValues::new();
        for placeholder in placeholders {
            let binding = self.binding(placeholder);
            let cell = row
                .get(self.column_for(placeholder))
                .filter(|v| !v.is_null())
                .map(|v| v.display_string());
            let raw = match cell {
                Some(text) if trim_values => text.trim().to_string(),
                Some(text) => text,
                None => match binding.and_then(|b| b.default_value.clone()) {
                    Some(default) => default,
                    None => {
                        if !row.contains_key(self.column_for(placeholder)) {
                            continue;
                        }
                        String::new()
                    }
                },
            };
            let value = match binding.and_then(|b| b.transform) {
                Some(transform) => transform.apply(&raw),
                None => raw,
            };
            values.insert(placeholder.clone(), value);
        }
        values
    }
}

/// Text encoded into each certificate's QR image, e.g.
/// `https://verify.example/{{CertificateNo}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrPattern(String);

impl QrPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names the pattern refers to
    pub fn placeholders(&self) -> Vec<String> {
        docx_template::extract_placeholders(&self.0)
    }

    /// Fill the pattern from a row's values. Missing names become empty.
    pub fn resolve(&self, values: &PlaceholderValues) -> String {
        let mut missing = HashSet::new();
        let text = placeholder_pattern().replace_all(&self.0, |caps: &regex_lite::Captures<'_>| {
            let name = &caps[1];
            match values.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.insert(name.to_string());
                    String::new()
                }
            }
        });
        for name in &missing {
            tracing::warn!("QR pattern refers to {} but the row has no value for it", name);
        }
        text.into_owned()
    }
}
