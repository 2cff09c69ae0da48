//! Pattern scanner over raw chunk text.
//!
//! Two fixed shapes are looked for, both keyed on one field label (by default
//! `drugName`):
//!
//! | Signal | Pattern |
//! |--------|---------|
//! | name | `"drugName":\s*"([^"]+)"` |
//! | record opening | `{"drugName"` |
//!
//! The scanner never fails on content.  An invalid *label* is the only error,
//! and it surfaces at construction.

use regex::Regex;
use thiserror::Error;

use super::PartialExtract;

/// Field whose string values identify a record.
pub const DEFAULT_FIELD_LABEL: &str  = "drugName";
/// Number of trailing characters kept for inspection.
pub const TAIL_CHARS:          usize = 200;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Field label must not be empty")]
    Empty,
    #[error("Invalid field label pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone)]
pub struct PartialExtractor {
    label:   String,
    pattern: Regex,
    marker:  String,
}

impl PartialExtractor {
    pub fn new(label: &str) -> Result<Self, LabelError> {
        if label.is_empty() {
            return Err(LabelError::Empty);
        }
        let pattern = Regex::new(&format!(r#""{}":\s*"([^"]+)""#, regex::escape(label)))?;
        Ok(Self {
            label:  label.to_owned(),
            pattern,
            marker: format!(r#"{{"{label}""#),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn extract_partial(&self, content: &str) -> PartialExtract {
        let names = self.pattern
            .captures_iter(content)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_owned())
            .collect();

        PartialExtract {
            names,
            tail:         tail(content, TAIL_CHARS).to_owned(),
            object_count: content.matches(self.marker.as_str()).count(),
        }
    }
}

impl Default for PartialExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_LABEL).expect("default field label compiles")
    }
}

/// Scan `content` with the default `drugName` label.
pub fn extract_partial(content: &str) -> PartialExtract {
    PartialExtractor::default().extract_partial(content)
}

/// Last `n` characters of `s`, on a char boundary.
fn tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None         => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUNCATED: &str = r#"[{"drugName": "Aspirin", "label": {"genericName": "asa"}},
{"drugName":"Ibuprofen","label":{}},{"drugName": "Naproxen", "label": {"gen"#;

    #[test]
    fn names_in_order_of_appearance() {
        let p = extract_partial(TRUNCATED);
        assert_eq!(p.names, ["Aspirin", "Ibuprofen", "Naproxen"]);
    }

    #[test]
    fn counts_record_openings() {
        let p = extract_partial(TRUNCATED);
        assert_eq!(p.object_count, 3);
    }

    #[test]
    fn tail_is_last_200_chars() {
        let long: String = "é".repeat(150) + &"x".repeat(150);
        let p = extract_partial(&long);
        assert_eq!(p.tail.chars().count(), TAIL_CHARS);
        assert!(p.tail.starts_with("ééé"));
        assert!(p.tail.ends_with("xxx"));

        assert_eq!(extract_partial("short").tail, "short");
    }

    #[test]
    fn nothing_matches() {
        let p = extract_partial("garbage ~~~");
        assert!(p.is_empty());
        assert_eq!(p.object_count, 0);
        assert_eq!(p.tail, "garbage ~~~");

        assert_eq!(extract_partial(""), PartialExtract::default());
    }

    #[test]
    fn custom_label_is_escaped() {
        let x = PartialExtractor::new("brand.name").unwrap();
        let p = x.extract_partial(r#"{"brand.name": "Advil"} {"brandXname": "Nope"}"#);
        assert_eq!(p.names, ["Advil"]);
        assert_eq!(p.object_count, 1);
        assert_eq!(x.label(), "brand.name");
    }

    #[test]
    fn empty_label_is_rejected() {
        assert!(matches!(PartialExtractor::new(""), Err(LabelError::Empty)));
    }

    #[test]
    fn tail_helper_edges() {
        assert_eq!(tail("abc", 0), "");
        assert_eq!(tail("abc", 2), "bc");
        assert_eq!(tail("abc", 3), "abc");
        assert_eq!(tail("abc", 10), "abc");
    }
}
