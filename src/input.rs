//! Raw standoff input, as exported by the annotation tool.
//!
//! Unpacking the tool's archive format is the caller's job; this crate
//! starts from the already-extracted text, spans and relations.
//!
//! ```rust
//! use standoff_tree::AnnotationExport;
//!
//! let export = AnnotationExport::from_json_str(r#"{
//!     "text": "Anna gave Ben a book .",
//!     "spans": [{"id": "s1", "begin": 0, "end": 4, "label": "nam.per"}],
//!     "relations": []
//! }"#).unwrap();
//! assert_eq!(export.spans[0].label.as_deref(), Some("nam.per"));
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One span annotation over character offsets of the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpan {
    /// Identifier assigned by the annotation tool.
    pub id: String,
    /// Character offset (start, inclusive).
    pub begin: usize,
    /// Character offset (end, exclusive).
    pub end: usize,
    /// Dotted label, if the annotator set one.
    #[serde(default)]
    pub label: Option<String>,
    /// Event role string (`buyer.1`), if any.
    #[serde(default)]
    pub role: Option<String>,
}

impl RawSpan {
    /// Create a labeled span without a role.
    #[must_use]
    pub fn new(id: impl Into<String>, begin: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            begin,
            end,
            label: Some(label.into()),
            role: None,
        }
    }

    /// Create a span that only carries a free-text role.
    #[must_use]
    pub fn free_text(id: impl Into<String>, begin: usize, end: usize, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            begin,
            end,
            label: None,
            role: Some(role.into()),
        }
    }

    /// Attach a role string.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// The label with surrounding whitespace removed; `None` if empty.
    #[must_use]
    pub fn label_str(&self) -> Option<&str> {
        self.label.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }

    /// The role with surrounding whitespace removed; `None` if empty.
    #[must_use]
    pub fn role_str(&self) -> Option<&str> {
        self.role.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

/// A directed relation annotation between two spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRelation {
    /// Identifier assigned by the annotation tool.
    pub id: String,
    /// Relation label (`gift`, `coref`, ...).
    #[serde(default)]
    pub label: Option<String>,
    /// Id of the source span.
    pub source: String,
    /// Id of the target span.
    pub target: String,
}

impl RawRelation {
    /// Create a relation.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Everything the converter needs for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationExport {
    /// Document identifier, carried through to the output.
    #[serde(default)]
    pub id: Option<String>,
    /// Document text the offsets refer to.
    pub text: String,
    /// Span annotations, in any order.
    #[serde(default)]
    pub spans: Vec<RawSpan>,
    /// Relation annotations.
    #[serde(default)]
    pub relations: Vec<RawRelation>,
}

impl AnnotationExport {
    /// Create an export with no annotations.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Add a span.
    #[must_use]
    pub fn with_span(mut self, span: RawSpan) -> Self {
        self.spans.push(span);
        self
    }

    /// Add a relation.
    #[must_use]
    pub fn with_relation(mut self, relation: RawRelation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Parse an export from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Read an export JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Reject offsets that cannot refer to this text.
    ///
    /// Only structurally impossible input fails here; everything else is
    /// handled later with diagnostics.
    pub fn validate(&self) -> Result<()> {
        let len = self.text.chars().count();
        for span in &self.spans {
            if span.begin > span.end {
                return Err(Error::invalid_input(format!(
                    "span {} has begin {} > end {}",
                    span.id, span.begin, span.end
                )));
            }
            if span.end > len {
                return Err(Error::invalid_input(format!(
                    "span {} ends at {} beyond text length {}",
                    span.id, span.end, len
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_optional_fields() {
        let export = AnnotationExport::from_json_str(
            r#"{"text": "a b", "spans": [{"id": "1", "begin": 0, "end": 1}]}"#,
        )
        .unwrap();
        assert!(export.relations.is_empty());
        assert_eq!(export.spans[0].label, None);
        assert_eq!(export.spans[0].role, None);
    }

    #[test]
    fn test_blank_label_is_missing() {
        let span = RawSpan {
            id: "x".into(),
            begin: 0,
            end: 1,
            label: Some("  ".into()),
            role: Some("price.1".into()),
        };
        assert_eq!(span.label_str(), None);
        assert_eq!(span.role_str(), Some("price.1"));
    }

    #[test]
    fn test_validate_rejects_inverted_span() {
        let export = AnnotationExport::new("abc").with_span(RawSpan::new("s", 2, 1, "nam.per"));
        assert!(matches!(export.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_counts_chars_not_bytes() {
        let export = AnnotationExport::new("café").with_span(RawSpan::new("s", 0, 4, "nam.loc"));
        assert!(export.validate().is_ok());
        let export = AnnotationExport::new("café").with_span(RawSpan::new("s", 0, 5, "nam.loc"));
        assert!(export.validate().is_err());
    }
}
