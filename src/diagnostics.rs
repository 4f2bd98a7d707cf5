//! Per-document anomaly reporting.
//!
//! Every anomaly is logged once through the `log` facade and kept as a
//! [`Diagnostic`] in the output document, so callers can inspect them
//! without installing a logger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a reported anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Missing/unparseable label, offset inside a token, unresolvable
    /// coreference, dangling relation endpoint, unattached role.
    MalformedInput,
    /// Annotation breaks a structural rule of the scheme (e.g. an attribute
    /// without a parent mention, several unnumbered triggers in one scope).
    SchemaViolation,
    /// Informational: the input was interpreted, not repaired.
    Notice,
}

impl DiagnosticKind {
    /// Short label used in log lines and CLI summaries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedInput => "malformed",
            DiagnosticKind::SchemaViolation => "schema",
            DiagnosticKind::Notice => "notice",
        }
    }
}

/// One reported anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What kind of anomaly this is.
    pub kind: DiagnosticKind,
    /// Id of the source annotation (span or relation), when one is involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span_id {
            Some(id) => write!(f, "[{}] {}: {}", self.kind.as_str(), id, self.message),
            None => write!(f, "[{}] {}", self.kind.as_str(), self.message),
        }
    }
}

/// Collector for one document's diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit its log line.
    pub fn push(&mut self, kind: DiagnosticKind, span_id: Option<&str>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            span_id: span_id.map(str::to_owned),
            message: message.into(),
        };
        match kind {
            DiagnosticKind::MalformedInput => log::warn!("{}", diagnostic),
            DiagnosticKind::SchemaViolation => log::error!("{}", diagnostic),
            DiagnosticKind::Notice => log::debug!("{}", diagnostic),
        }
        self.items.push(diagnostic);
    }

    /// Record a [`DiagnosticKind::MalformedInput`].
    pub fn malformed(&mut self, span_id: Option<&str>, message: impl Into<String>) {
        self.push(DiagnosticKind::MalformedInput, span_id, message);
    }

    /// Record a [`DiagnosticKind::SchemaViolation`].
    pub fn violation(&mut self, span_id: Option<&str>, message: impl Into<String>) {
        self.push(DiagnosticKind::SchemaViolation, span_id, message);
    }

    /// Record a [`DiagnosticKind::Notice`].
    pub fn notice(&mut self, span_id: Option<&str>, message: impl Into<String>) {
        self.push(DiagnosticKind::Notice, span_id, message);
    }

    /// All recorded diagnostics, in report order.
    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Number of diagnostics of the given kind.
    #[must_use]
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the collector.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_span() {
        let mut diags = Diagnostics::new();
        diags.malformed(Some("s3"), "label missing");
        diags.notice(None, "implicit head");

        let rendered: Vec<String> = diags.as_slice().iter().map(ToString::to_string).collect();
        assert_eq!(rendered[0], "[malformed] s3: label missing");
        assert_eq!(rendered[1], "[notice] implicit head");
    }

    #[test]
    fn test_count_by_kind() {
        let mut diags = Diagnostics::new();
        diags.violation(Some("a"), "x");
        diags.violation(Some("b"), "y");
        diags.notice(None, "z");

        assert_eq!(diags.count(DiagnosticKind::SchemaViolation), 2);
        assert_eq!(diags.count(DiagnosticKind::MalformedInput), 0);
        assert!(!diags.is_empty());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DiagnosticKind::SchemaViolation).unwrap();
        assert_eq!(json, "\"schema_violation\"");
    }
}
