//! Mention, descriptor and value records.

use super::ExtractionContext;
use crate::document::{Attribute, Descriptor, ListMention, Mention, RecordId, Reference, Value};
use crate::label::resolve_head;
use crate::offset::TokenRange;
use crate::span::SpanKind;
use crate::tree::NodeId;

/// Records of the first extraction stage.
#[derive(Debug, Default)]
pub struct MentionRecords {
    /// Lists, references, attributes.
    pub mentions: Vec<Mention>,
    /// Descriptors.
    pub descriptors: Vec<Descriptor>,
    /// Values.
    pub values: Vec<Value>,
}

/// Visit the tree once per kind, in id order: lists, references,
/// attributes, descriptors, values.
pub fn extract_mentions(ctx: &mut ExtractionContext<'_>) -> MentionRecords {
    let tree = ctx.tree;
    let order = tree.preorder();
    let mut out = MentionRecords::default();

    for &node in &order {
        if let SpanKind::List { subtype } = &tree.node(node).kind {
            let range = tree.node(node).range;
            let id = ctx.assign(node, range);
            let entity_types = ctx.decoder.list_types(node, &mut ctx.diags);
            out.mentions.push(Mention::List(ListMention {
                id,
                subtype: subtype.clone(),
                entity_types,
                begin: range.begin,
                end: range.end,
                text: ctx.text.text_of(range),
            }));
        }
    }

    for &node in &order {
        if !matches!(tree.node(node).kind, SpanKind::Entity { .. }) {
            continue;
        }
        let Some(info) = ctx.decoder.entity(node, &mut ctx.diags) else {
            continue;
        };
        let range = tree.node(node).range;
        let id = ctx.assign(node, range);
        let head = resolve_head(tree, node, &mut ctx.diags);
        out.mentions.push(Mention::Reference(Reference {
            id,
            mention_type: info.mention_type,
            entity_type: info.entity_type,
            number: info.number,
            specificity: info.specificity,
            tense: info.tense,
            begin: range.begin,
            end: range.end,
            head: head.map(|h| (h.begin, h.end)),
            text: ctx.text.text_of(range),
            head_text: head.map(|h| ctx.text.text_of(h)).unwrap_or_default(),
        }));
    }

    for &node in &order {
        if !matches!(tree.node(node).kind, SpanKind::Attribute { .. }) {
            continue;
        }
        // Dropped attributes get no id.
        let Some(info) = ctx.decoder.attribute(node, &mut ctx.diags) else {
            continue;
        };
        let range = tree.node(node).range;
        let id = ctx.assign(node, range);
        let head = resolve_head(tree, node, &mut ctx.diags);
        out.mentions.push(Mention::Attribute(Attribute {
            id,
            mention_type: info.mention_type,
            entity_type: info.entity_type,
            subtype: info.subtype,
            number: info.number,
            specificity: info.specificity,
            tense: info.tense,
            begin: range.begin,
            end: range.end,
            head: head.map(|h| (h.begin, h.end)),
            text: ctx.text.text_of(range),
            head_text: head.map(|h| ctx.text.text_of(h)).unwrap_or_default(),
        }));
    }

    for &node in &order {
        let SpanKind::Descriptor { desc_type } = &tree.node(node).kind else {
            continue;
        };
        let range = tree.node(node).range;
        let id = ctx.assign(node, range);
        let target = descriptor_target(ctx, node, range);
        out.descriptors.push(Descriptor {
            id,
            desc_type: desc_type.clone(),
            target,
            begin: range.begin,
            end: range.end,
            text: ctx.text.text_of(range),
        });
    }

    for &node in &order {
        let SpanKind::Value { value_type } = &tree.node(node).kind else {
            continue;
        };
        let range = tree.node(node).range;
        let id = ctx.assign(node, range);
        out.values.push(Value {
            id,
            value_type: value_type.clone(),
            begin: range.begin,
            end: range.end,
            text: ctx.text.text_of(range),
        });
    }

    out
}

fn is_mention(kind: &SpanKind) -> bool {
    matches!(
        kind,
        SpanKind::Entity { .. } | SpanKind::List { .. } | SpanKind::Attribute { .. }
    )
}

/// The mention a descriptor describes: the nearest enclosing mention, or a
/// child covering exactly the same tokens.
fn descriptor_target(ctx: &mut ExtractionContext<'_>, node: NodeId, range: TokenRange) -> Option<RecordId> {
    let tree = ctx.tree;
    let enclosing = tree
        .ancestors(node)
        .filter(|&a| is_mention(&tree.node(a).kind))
        .find_map(|a| ctx.id_of(a));
    if enclosing.is_some() {
        return enclosing;
    }
    let same_range = tree
        .children(node)
        .iter()
        .copied()
        .filter(|&c| is_mention(&tree.node(c).kind) && tree.node(c).range == range)
        .find_map(|c| ctx.id_of(c));
    if same_range.is_none() {
        ctx.diags
            .violation(tree.node(node).id_str(), "descriptor describes no mention");
    }
    same_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::input::RawSpan;
    use crate::offset::TokenizedText;
    use crate::schema::default_schema;
    use crate::span::classify;
    use crate::tree::SpanTree;
    use crate::DiagnosticKind;

    fn run(text: &str, spans: &[RawSpan]) -> (MentionRecords, Diagnostics) {
        let mut diags = Diagnostics::new();
        let tokenized = TokenizedText::segment(text);
        let classified = spans
            .iter()
            .enumerate()
            .map(|(i, s)| classify(s, i, default_schema(), &mut diags))
            .collect();
        let tree = SpanTree::build(classified, &tokenized, &mut diags);
        let mut ctx = ExtractionContext::new(default_schema(), &tree, &tokenized, &[], diags);
        let records = extract_mentions(&mut ctx);
        (records, ctx.diags)
    }

    #[test]
    fn test_ids_follow_kind_order_not_text_order() {
        let (records, _) = run(
            "on Monday Anna and Ben , the baker",
            &[
                RawSpan::new("val", 3, 9, "val.date"),
                RawSpan::new("anna", 10, 14, "nam.per"),
                RawSpan::new("lst", 10, 22, "lst"),
                RawSpan::new("ben", 19, 22, "nam.per"),
                RawSpan::new("desc", 25, 34, "desc.occupation"),
                RawSpan::new("baker", 25, 34, "nom.per"),
            ],
        );
        // list 0, references 1..=3, descriptor 4, value 5
        let ids: Vec<RecordId> = records.mentions.iter().map(Mention::id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(matches!(records.mentions[0], Mention::List(_)));
        assert_eq!(records.descriptors[0].id, 4);
        assert_eq!(records.values[0].id, 5);
        assert_eq!(records.values[0].value_type, "date");
    }

    #[test]
    fn test_list_collects_member_types() {
        let (records, _) = run(
            "Anna and Paris",
            &[
                RawSpan::new("l", 0, 14, "lst.conj"),
                RawSpan::new("a", 0, 4, "nam.per"),
                RawSpan::new("p", 9, 14, "nam.loc"),
            ],
        );
        let Mention::List(list) = &records.mentions[0] else {
            panic!("list first");
        };
        assert_eq!(list.entity_types, vec!["per", "loc"]);
        assert_eq!(list.subtype.as_deref(), Some("conj"));
        assert_eq!(list.text, "Anna and Paris");
    }

    #[test]
    fn test_descriptor_targets_identical_child() {
        let (records, diags) = run(
            "the baker",
            &[
                RawSpan::new("e", 0, 9, "nom.per"),
                RawSpan::new("d", 0, 9, "desc.occupation"),
            ],
        );
        assert_eq!(records.descriptors[0].target, Some(0));
        assert_eq!(diags.count(DiagnosticKind::SchemaViolation), 0);
    }

    #[test]
    fn test_descriptor_without_mention_is_violation() {
        let (records, diags) = run("bakery", &[RawSpan::new("d", 0, 6, "desc.place")]);
        assert_eq!(records.descriptors[0].target, None);
        assert_eq!(diags.count(DiagnosticKind::SchemaViolation), 1);
    }

    #[test]
    fn test_reference_head_text() {
        let (records, _) = run(
            "the old man",
            &[RawSpan::new("m", 0, 11, "nom.per"), RawSpan::new("h", 8, 11, "head")],
        );
        let Mention::Reference(r) = &records.mentions[0] else {
            panic!("reference");
        };
        assert_eq!(r.head, Some((2, 3)));
        assert_eq!(r.head_text, "man");
        assert_eq!(r.text, "the old man");
    }

    #[test]
    fn test_dropped_attribute_gets_no_id() {
        let (records, _) = run(
            "tall Anna",
            &[RawSpan::new("x", 0, 4, "att.height"), RawSpan::new("a", 5, 9, "nam.per")],
        );
        assert_eq!(records.mentions.len(), 1);
        assert_eq!(records.mentions[0].id(), 0);
    }
}
