//! Record extraction from the containment tree.
//!
//! Extraction runs in a fixed order because ids are handed out from one
//! counter as records are created:
//!
//! 1. [`mentions`]: lists, references, attributes, descriptors, values
//! 2. [`events`]: candidates get ids first, then roles are attached
//! 3. [`relations`]: explicit, structural, and the hierarchy edges
//!
//! All per-document state lives in [`ExtractionContext`]; nothing is shared
//! between documents except the read-only schema.

pub mod events;
pub mod mentions;
pub mod relations;

use crate::diagnostics::Diagnostics;
use crate::document::{Descriptor, Event, HierarchyEdge, Mention, RecordId, Relation, Value};
use crate::input::RawRelation;
use crate::label::LabelDecoder;
use crate::offset::{TokenRange, TokenizedText};
use crate::schema::CompiledSchema;
use crate::tree::{NodeId, SpanTree};
use crate::{Error, Result};
use std::collections::HashMap;

/// Per-document extraction state: id counter, node → id map, record
/// ranges, label decoder and diagnostics.
pub struct ExtractionContext<'a> {
    /// Vocabulary.
    pub schema: &'a CompiledSchema,
    /// Containment tree.
    pub tree: &'a SpanTree,
    /// Segmented text.
    pub text: &'a TokenizedText,
    /// Label decoder (memoized).
    pub decoder: LabelDecoder<'a>,
    /// Tool span id → node.
    pub span_index: HashMap<String, NodeId>,
    /// Diagnostics collected so far.
    pub diags: Diagnostics,
    next_id: RecordId,
    ids: HashMap<NodeId, RecordId>,
    ranges: HashMap<RecordId, TokenRange>,
}

impl<'a> ExtractionContext<'a> {
    /// Fresh context for one document.
    #[must_use]
    pub fn new(
        schema: &'a CompiledSchema,
        tree: &'a SpanTree,
        text: &'a TokenizedText,
        relations: &[RawRelation],
        diags: Diagnostics,
    ) -> Self {
        let span_index: HashMap<String, NodeId> = (0..tree.len())
            .filter_map(|n| tree.node(n).span_id.clone().map(|id| (id, n)))
            .collect();
        let decoder = LabelDecoder::new(schema, tree, &span_index, relations);
        Self {
            schema,
            tree,
            text,
            decoder,
            span_index,
            diags,
            next_id: 0,
            ids: HashMap::new(),
            ranges: HashMap::new(),
        }
    }

    /// Give `node` the next id.
    pub fn assign(&mut self, node: NodeId, range: TokenRange) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(node, id);
        self.ranges.insert(id, range);
        id
    }

    /// Make `node` resolve to an existing record (a trigger to its event).
    pub fn alias(&mut self, node: NodeId, id: RecordId) {
        self.ids.insert(node, id);
    }

    /// Record id of a node, if it has one.
    #[must_use]
    pub fn id_of(&self, node: NodeId) -> Option<RecordId> {
        self.ids.get(&node).copied()
    }

    /// Record id of a node that must already have one.
    pub fn require_id(&self, node: NodeId) -> Result<RecordId> {
        self.id_of(node).ok_or_else(|| {
            Error::invariant(format!(
                "node {} ({}) referenced before an id was assigned",
                node,
                self.tree.node(node).id_str().unwrap_or("root")
            ))
        })
    }

    /// Token range of a record.
    #[must_use]
    pub fn range_of(&self, id: RecordId) -> Option<TokenRange> {
        self.ranges.get(&id).copied()
    }

    /// Update the token range of a record.
    pub fn set_range(&mut self, id: RecordId, range: TokenRange) {
        self.ranges.insert(id, range);
    }

    /// Number of ids handed out.
    #[must_use]
    pub fn assigned(&self) -> usize {
        self.next_id
    }

    /// Node of a tool span id.
    #[must_use]
    pub fn node_of_span(&self, span_id: &str) -> Option<NodeId> {
        self.span_index.get(span_id).copied()
    }
}

/// Everything extracted from one tree.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Lists, references, attributes.
    pub mentions: Vec<Mention>,
    /// Descriptors.
    pub descriptors: Vec<Descriptor>,
    /// Values.
    pub values: Vec<Value>,
    /// Events.
    pub events: Vec<Event>,
    /// Relations.
    pub relations: Vec<Relation>,
    /// Hierarchy edges.
    pub hierarchy: Vec<HierarchyEdge>,
    /// Diagnostics, including those passed in.
    pub diagnostics: Diagnostics,
}

/// Run all extraction stages over a built tree.
pub fn extract(
    schema: &CompiledSchema,
    tree: &SpanTree,
    text: &TokenizedText,
    relations: &[RawRelation],
    diags: Diagnostics,
) -> Result<Extraction> {
    let mut ctx = ExtractionContext::new(schema, tree, text, relations, diags);

    let records = mentions::extract_mentions(&mut ctx);
    let events = events::extract_events(&mut ctx)?;
    let mut relation_records = relations::explicit_relations(&mut ctx, relations);
    relation_records.extend(relations::structural_relations(&mut ctx, &records.descriptors)?);
    let hierarchy = relations::hierarchy(&ctx);

    log::debug!(
        "extracted {} mentions, {} descriptors, {} values, {} events, {} relations ({} ids)",
        records.mentions.len(),
        records.descriptors.len(),
        records.values.len(),
        events.len(),
        relation_records.len(),
        ctx.assigned()
    );

    Ok(Extraction {
        mentions: records.mentions,
        descriptors: records.descriptors,
        values: records.values,
        events,
        relations: relation_records,
        hierarchy,
        diagnostics: ctx.diags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::RawSpan;
    use crate::schema::default_schema;
    use crate::span::classify;

    #[test]
    fn test_require_id_reports_invariant() {
        let mut diags = Diagnostics::new();
        let text = TokenizedText::segment("Anna");
        let spans = vec![classify(&RawSpan::new("a", 0, 4, "nam.per"), 0, default_schema(), &mut diags)];
        let tree = SpanTree::build(spans, &text, &mut diags);
        let mut ctx = ExtractionContext::new(default_schema(), &tree, &text, &[], diags);

        let node = ctx.node_of_span("a").unwrap();
        let err = ctx.require_id(node).unwrap_err();
        assert!(err.is_invariant());

        let id = ctx.assign(node, TokenRange::new(0, 1));
        assert_eq!(ctx.require_id(node).unwrap(), id);
        assert_eq!(ctx.range_of(id), Some(TokenRange::new(0, 1)));
    }
}
