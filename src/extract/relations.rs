//! Relation records and hierarchy edges.
//!
//! Relations come from five places:
//!
//! | Origin              | Source → target                                       | Type              |
//! |---------------------|-------------------------------------------------------|-------------------|
//! | `explicit`          | annotated relation endpoints                          | relation label    |
//! | `nested`            | entity with a relation marker → nested mentions       | the marker        |
//! | `attribute`         | attribute → nested mentions                           | attribute subtype |
//! | `attribute_parent`  | attribute → the mention it qualifies                  | configured        |
//! | `descriptor`        | described mention → entities nested in the descriptor | descriptor type   |
//!
//! Endpoints must already have ids. A relation whose endpoint has none is
//! reported and dropped.

use super::ExtractionContext;
use crate::document::{Descriptor, HierarchyEdge, RecordId, RecordRef, Relation, RelationOrigin};
use crate::input::RawRelation;
use crate::span::SpanKind;
use crate::tree::NodeId;
use crate::Result;
use std::collections::HashMap;

/// Relations annotated in the export.
pub fn explicit_relations(ctx: &mut ExtractionContext<'_>, relations: &[RawRelation]) -> Vec<Relation> {
    let mut out = Vec::with_capacity(relations.len());
    for rel in relations {
        let rel_id = Some(rel.id.as_str());
        let source = endpoint(ctx, &rel.source);
        let target = endpoint(ctx, &rel.target);
        let (Some(source), Some(target)) = (source, target) else {
            let missing = if source.is_none() { &rel.source } else { &rel.target };
            ctx.diags.malformed(
                rel_id,
                format!("endpoint {} has no record, relation dropped", missing),
            );
            continue;
        };

        let label = rel.label.as_deref().map(str::trim).unwrap_or("").to_lowercase();
        if label.is_empty() {
            ctx.diags.malformed(rel_id, "relation without label");
        }
        let mut tense = None;
        let mut type_segments = Vec::new();
        for segment in label.split('.').filter(|s| !s.is_empty()) {
            if tense.is_none() && ctx.schema.tense_values.contains(segment) {
                tense = Some(segment.to_string());
            } else {
                type_segments.push(segment);
            }
        }
        out.push(Relation {
            source,
            target,
            relation_type: type_segments.join("."),
            tense,
            origin: RelationOrigin::Explicit,
        });
    }
    out
}

fn endpoint(ctx: &ExtractionContext<'_>, span_id: &str) -> Option<usize> {
    ctx.node_of_span(span_id).and_then(|n| ctx.id_of(n))
}

/// Relations implied by nesting under entities, attributes and descriptors.
///
/// A descriptor relation starts at the mention the descriptor describes;
/// descriptors without a target (already reported) yield none.
pub fn structural_relations(
    ctx: &mut ExtractionContext<'_>,
    descriptors: &[Descriptor],
) -> Result<Vec<Relation>> {
    let tree = ctx.tree;
    let mut out = Vec::new();
    let described: HashMap<RecordId, RecordId> = descriptors
        .iter()
        .filter_map(|d| d.target.map(|t| (d.id, t)))
        .collect();

    for node in tree.preorder() {
        let Some(source) = ctx.id_of(node) else {
            continue;
        };
        match &tree.node(node).kind {
            SpanKind::Entity { .. } => {
                let Some(info) = ctx.decoder.entity(node, &mut ctx.diags) else {
                    continue;
                };
                for relation_type in &info.relation_types {
                    for target in nested_targets(ctx, node, true) {
                        out.push(Relation {
                            source,
                            target,
                            relation_type: relation_type.clone(),
                            tense: info.tense.clone(),
                            origin: RelationOrigin::Nested,
                        });
                    }
                }
            }
            SpanKind::Attribute { subtype, .. } => {
                let relation_type = subtype.clone().unwrap_or_else(|| ctx.schema.attribute_tag.clone());
                for target in nested_targets(ctx, node, true) {
                    out.push(Relation {
                        source,
                        target,
                        relation_type: relation_type.clone(),
                        tense: None,
                        origin: RelationOrigin::Attribute,
                    });
                }
                let info = ctx.decoder.attribute(node, &mut ctx.diags);
                let Some(info) = info else {
                    // Only attributes that inherited a type get an id.
                    return Err(crate::Error::invariant(format!(
                        "attribute {} has an id but no parent",
                        tree.node(node).id_str().unwrap_or("?")
                    )));
                };
                out.push(Relation {
                    source,
                    target: ctx.require_id(info.inherited_from)?,
                    relation_type: ctx.schema.attribute_parent_relation.clone(),
                    tense: info.tense,
                    origin: RelationOrigin::AttributeParent,
                });
            }
            SpanKind::Descriptor { desc_type } => {
                let Some(&described) = described.get(&source) else {
                    continue;
                };
                let relation_type = desc_type.clone().unwrap_or_else(|| ctx.schema.descriptor_tag.clone());
                for target in nested_targets(ctx, node, false) {
                    if target == described {
                        continue;
                    }
                    out.push(Relation {
                        source: described,
                        target,
                        relation_type: relation_type.clone(),
                        tense: None,
                        origin: RelationOrigin::Descriptor,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Ids of direct entity children (and list children if `lists`).
fn nested_targets(ctx: &ExtractionContext<'_>, node: NodeId, lists: bool) -> Vec<usize> {
    let tree = ctx.tree;
    tree.children(node)
        .iter()
        .copied()
        .filter(|&c| match tree.node(c).kind {
            SpanKind::Entity { .. } => true,
            SpanKind::List { .. } => lists,
            _ => false,
        })
        .filter_map(|c| ctx.id_of(c))
        .collect()
}

/// One edge per mention, descriptor and value to its nearest enclosing
/// record of those kinds, ordered by child id.
#[must_use]
pub fn hierarchy(ctx: &ExtractionContext<'_>) -> Vec<HierarchyEdge> {
    let tree = ctx.tree;
    let qualifying = |n: NodeId| {
        if tree.node(n).kind.is_hierarchical() {
            ctx.id_of(n)
        } else {
            None
        }
    };
    let mut edges: Vec<HierarchyEdge> = tree
        .preorder()
        .into_iter()
        .filter_map(|node| {
            let child = qualifying(node)?;
            let parent = tree
                .ancestors(node)
                .find_map(qualifying)
                .map_or(RecordRef::Document, RecordRef::Record);
            Some(HierarchyEdge { parent, child })
        })
        .collect();
    edges.sort_by_key(|e| e.child);
    edges
}
