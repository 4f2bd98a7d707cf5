//! # standoff-tree
//!
//! Rebuild nested annotation structure from flat standoff exports.
//!
//! An annotation tool exports spans as character offsets into a text plus a
//! list of relations between span ids. This crate turns that flat, possibly
//! overlapping and mislabeled set into:
//!
//! - **Mentions**: lists, references and attributes, with resolved entity
//!   types (following coreference for pronouns) and heads
//! - **Descriptors / Values**: typed leaf records
//! - **Events**: triggers or event spans with subevents and roles
//! - **Relations**: explicit, plus those implied by nesting
//! - **Hierarchy**: containment edges between records
//!
//! ## Quick Start
//!
//! ```rust
//! use standoff_tree::{convert, AnnotationExport, RawRelation, RawSpan};
//!
//! let export = AnnotationExport::new("Anna gave Ben a book .")
//!     .with_span(RawSpan::new("a", 0, 4, "nam.per"))
//!     .with_span(RawSpan::new("b", 10, 13, "nam.per"))
//!     .with_relation(RawRelation::new("r", "gift", "a", "b"));
//!
//! let doc = convert(export).unwrap();
//! assert_eq!(doc.references().count(), 2);
//! assert_eq!(doc.relations[0].relation_type, "gift");
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Text edits | [`preedit`] | edited text, shifted offsets |
//! | Segmentation | [`offset`] | lines, tokens, offset maps |
//! | Classification | [`span`] | [`span::SpanKind`] per span |
//! | Containment | [`tree`] | arena [`tree::SpanTree`] |
//! | Label decoding | [`label`] | entity types, modifiers, heads |
//! | Extraction | [`extract`] | records with dense ids |
//!
//! ## Record ids
//!
//! Ids come from one counter per document, in a fixed order: lists,
//! references, attributes, descriptors, values, events. Exporters key on
//! these ids, so the order is part of the output format.
//!
//! ## Diagnostics
//!
//! Bad annotations never fail a document. Each anomaly is logged through
//! the `log` facade and kept in [`Document::diagnostics`]. Only broken
//! internal invariants, I/O, JSON and schema errors surface as [`Error`].

#![warn(missing_docs)]

#[cfg(feature = "cli")]
pub mod cli;
mod diagnostics;
pub mod document;
mod error;
pub mod extract;
mod input;
pub mod label;
pub mod offset;
pub mod preedit;
pub mod schema;
pub mod span;
pub mod tree;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use document::{
    Anchor, Attribute, Descriptor, Document, Event, HierarchyEdge, ListMention, Mention, RecordId,
    RecordRef, Reference, Relation, RelationOrigin, Role, RoleTarget, Subevent, Trigger, Value,
};
pub use error::{Error, Result};
pub use input::{AnnotationExport, RawRelation, RawSpan};
pub use schema::{default_schema, CompiledSchema, NormalizationRule, Schema};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        convert, AnnotationExport, Converter, DiagnosticKind, Document, Error, Mention, RawRelation,
        RawSpan, Result, Schema,
    };
}

use offset::TokenizedText;
use tree::SpanTree;

// =============================================================================
// Converter
// =============================================================================

/// Converts annotation exports into [`Document`]s.
///
/// Holds only read-only configuration; one converter can serve any number
/// of documents, including from several threads.
#[derive(Debug, Clone)]
pub struct Converter {
    schema: CompiledSchema,
    text_edits: bool,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(default_schema().clone())
    }
}

impl Converter {
    /// Converter for a compiled schema.
    #[must_use]
    pub fn new(schema: CompiledSchema) -> Self {
        Self {
            schema,
            text_edits: true,
        }
    }

    /// Enable or disable the text pre-edit stage (on by default).
    #[must_use]
    pub fn with_text_edits(mut self, enabled: bool) -> Self {
        self.text_edits = enabled;
        self
    }

    /// The schema in use.
    #[must_use]
    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Convert one export.
    ///
    /// # Errors
    ///
    /// Only [`Error::Invariant`]; annotation problems end up in
    /// [`Document::diagnostics`].
    pub fn convert(&self, export: AnnotationExport) -> Result<Document> {
        let mut diags = Diagnostics::new();
        let export = sanitize(export, &mut diags);
        let export = if self.text_edits {
            preedit::apply_text_edits(export, &self.schema, &mut diags)
        } else {
            export
        };

        let text = TokenizedText::segment(&export.text);
        let classified = export
            .spans
            .iter()
            .enumerate()
            .map(|(order, span)| span::classify(span, order, &self.schema, &mut diags))
            .collect();
        let tree = SpanTree::build(classified, &text, &mut diags);
        log::debug!(
            "document {}: {} tokens, {} spans, {} tree nodes",
            export.id.as_deref().unwrap_or("-"),
            text.len(),
            export.spans.len(),
            tree.len()
        );

        let extraction = extract::extract(&self.schema, &tree, &text, &export.relations, diags)?;

        Ok(Document {
            id: export.id,
            lines: text.lines().to_vec(),
            mentions: extraction.mentions,
            descriptors: extraction.descriptors,
            values: extraction.values,
            events: extraction.events,
            relations: extraction.relations,
            hierarchy: extraction.hierarchy,
            diagnostics: extraction.diagnostics.into_vec(),
        })
    }
}

/// Convert with the built-in schema.
pub fn convert(export: AnnotationExport) -> Result<Document> {
    Converter::default().convert(export)
}

/// Drop spans whose offsets cannot refer to the text.
fn sanitize(mut export: AnnotationExport, diags: &mut Diagnostics) -> AnnotationExport {
    let len = export.text.chars().count();
    export.spans.retain(|span| {
        if span.begin > span.end || span.end > len {
            diags.malformed(
                Some(&span.id),
                format!(
                    "offsets {}..{} invalid for text of {} chars, span dropped",
                    span.begin, span.end, len
                ),
            );
            false
        } else {
            true
        }
    });
    export
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_offsets_are_dropped_not_fatal() {
        let export = AnnotationExport::new("Anna")
            .with_span(RawSpan::new("ok", 0, 4, "nam.per"))
            .with_span(RawSpan::new("bad", 2, 40, "nam.per"))
            .with_span(RawSpan::new("rev", 3, 1, "nam.per"));
        let doc = convert(export).unwrap();
        assert_eq!(doc.mentions.len(), 1);
        assert_eq!(doc.diagnostics_of(DiagnosticKind::MalformedInput).count(), 2);
    }

    #[test]
    fn test_text_edits_can_be_disabled() {
        let export = AnnotationExport::new("Anna xx Ben")
            .with_span(RawSpan::new("d", 5, 7, "htr.delete"))
            .with_span(RawSpan::new("b", 8, 11, "nam.per"));

        let edited = convert(export.clone()).unwrap();
        assert_eq!(edited.token_count(), 2);
        assert_eq!(edited.mentions[0].range(), (1, 2));

        let raw = Converter::default().with_text_edits(false).convert(export).unwrap();
        assert_eq!(raw.token_count(), 3);
        assert_eq!(raw.mentions[0].range(), (2, 3));
    }

    #[test]
    fn test_document_id_carried_through() {
        let mut export = AnnotationExport::new("x");
        export.id = Some("doc-7".into());
        assert_eq!(convert(export).unwrap().id.as_deref(), Some("doc-7"));
    }

    #[test]
    fn test_empty_text() {
        let doc = convert(AnnotationExport::new("")).unwrap();
        assert_eq!(doc.token_count(), 0);
        assert!(doc.mentions.is_empty());
        assert!(doc.hierarchy.is_empty());
    }
}
