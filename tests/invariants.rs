//! Invariant Tests for standoff-tree
//!
//! Properties that must hold for any input, however badly annotated:
//! conversion never fails, is deterministic, hands out ids densely in kind
//! order, never emits dangling relation endpoints and keeps heads inside
//! their mentions.

use proptest::prelude::*;
use standoff_tree::{convert, AnnotationExport, Document, Mention, RawRelation, RawSpan, RecordRef, RoleTarget};
use std::collections::{BTreeSet, HashMap};

const WORDS: &[&str] = &["Anna", "sold", "the", "house", "to", "Ben", ",", "Zoë", "Łódź", "."];

const LABELS: &[&str] = &[
    "nam.per",
    "nom.org.plural",
    "nam.loc.rel",
    "pro",
    "lst",
    "att.role",
    "att.alias",
    "desc.occupation",
    "head",
    "val.date",
    "ev.sale",
    "ev1.sale.past",
    "ev2.payment",
    "evs.payment",
    "bogus",
];

const ROLES: &[&str] = &["buyer", "buyer.1", "seller.2", "goods.1.1", "goods.1.2"];

#[derive(Debug, Clone)]
struct SpanPlan {
    first: usize,
    len: usize,
    begin_shift: usize,
    end_shift: usize,
    label: Option<usize>,
    role: Option<usize>,
}

fn span_plan() -> impl Strategy<Value = SpanPlan> {
    (
        0usize..12,
        1usize..5,
        0usize..3,
        0usize..3,
        prop::option::weighted(0.9, 0..LABELS.len()),
        prop::option::weighted(0.3, 0..ROLES.len()),
    )
        .prop_map(|(first, len, begin_shift, end_shift, label, role)| SpanPlan {
            first,
            len,
            begin_shift,
            end_shift,
            label,
            role,
        })
}

prop_compose! {
    fn arb_export()(
        words in prop::collection::vec((0..WORDS.len(), 0u8..4), 1..12),
        plans in prop::collection::vec(span_plan(), 0..14),
        rels in prop::collection::vec((0usize..14, 0usize..14, prop::bool::ANY), 0..4),
    ) -> AnnotationExport {
        // Separators: mostly one space, sometimes two, sometimes a newline.
        let mut text = String::new();
        let mut bounds = Vec::new();
        for (i, (w, sep)) in words.iter().enumerate() {
            if i > 0 {
                text.push_str(match sep {
                    0 => "  ",
                    1 => "\n",
                    _ => " ",
                });
            }
            let start = text.chars().count();
            text.push_str(WORDS[*w]);
            bounds.push((start, text.chars().count()));
        }
        let char_len = text.chars().count();

        let mut export = AnnotationExport::new(text);
        for (i, plan) in plans.iter().enumerate() {
            let first = plan.first.min(bounds.len() - 1);
            let last = (first + plan.len - 1).min(bounds.len() - 1);
            let begin = (bounds[first].0 + plan.begin_shift).min(char_len);
            let end = bounds[last].1.saturating_sub(plan.end_shift).max(begin);
            let mut span = match plan.label {
                Some(l) => RawSpan::new(format!("T{}", i), begin, end, LABELS[l]),
                None => RawSpan {
                    id: format!("T{}", i),
                    begin,
                    end,
                    label: None,
                    role: None,
                },
            };
            if let Some(r) = plan.role {
                span = span.with_role(ROLES[r]);
            }
            export = export.with_span(span);
        }
        for (i, (s, t, coref)) in rels.into_iter().enumerate() {
            let label = if coref { "coref" } else { "gift.past" };
            export = export.with_relation(RawRelation::new(
                format!("R{}", i),
                label,
                format!("T{}", s),
                format!("T{}", t),
            ));
        }
        export
    }
}

fn kind_rank(doc: &Document) -> HashMap<usize, u8> {
    let mut ranks = HashMap::new();
    for m in &doc.mentions {
        let rank = match m {
            Mention::List(_) => 0,
            Mention::Reference(_) => 1,
            Mention::Attribute(_) => 2,
        };
        ranks.insert(m.id(), rank);
    }
    ranks.extend(doc.descriptors.iter().map(|d| (d.id, 3)));
    ranks.extend(doc.values.iter().map(|v| (v.id, 4)));
    ranks.extend(doc.events.iter().map(|e| (e.id, 5)));
    ranks
}

mod id_invariants {
    use super::*;

    proptest! {
        /// INVARIANT: converting the same export twice gives the same document
        #[test]
        fn conversion_is_deterministic(export in arb_export()) {
            let a = convert(export.clone()).unwrap();
            let b = convert(export).unwrap();
            prop_assert_eq!(a, b);
        }

        /// INVARIANT: ids are 0..n without gaps
        #[test]
        fn ids_are_dense(export in arb_export()) {
            let doc = convert(export).unwrap();
            let ids = doc.record_ids();
            let expected: BTreeSet<usize> = (0..ids.len()).collect();
            prop_assert_eq!(ids, expected);
        }

        /// INVARIANT: lists < references < attributes < descriptors < values < events
        #[test]
        fn ids_follow_kind_order(export in arb_export()) {
            let doc = convert(export).unwrap();
            let ranks = kind_rank(&doc);
            let mut ids: Vec<_> = ranks.keys().copied().collect();
            ids.sort_unstable();
            for pair in ids.windows(2) {
                prop_assert!(
                    ranks[&pair[0]] <= ranks[&pair[1]],
                    "id {} (rank {}) before id {} (rank {})",
                    pair[0], ranks[&pair[0]], pair[1], ranks[&pair[1]]
                );
            }
        }
    }
}

mod reference_invariants {
    use super::*;

    proptest! {
        /// INVARIANT: relation endpoints, hierarchy edges and role targets
        /// refer to emitted records
        #[test]
        fn references_resolve(export in arb_export()) {
            let doc = convert(export).unwrap();
            let ids = doc.record_ids();
            for rel in &doc.relations {
                prop_assert!(ids.contains(&rel.source), "dangling source {:?}", rel);
                prop_assert!(ids.contains(&rel.target), "dangling target {:?}", rel);
            }
            for edge in &doc.hierarchy {
                prop_assert!(ids.contains(&edge.child));
                if let RecordRef::Record(parent) = edge.parent {
                    prop_assert!(ids.contains(&parent));
                }
            }
            for role in doc.events.iter().flat_map(|e| e.roles()) {
                if let RoleTarget::Record { id } = role.target {
                    prop_assert!(ids.contains(&id));
                }
            }
        }

        /// INVARIANT: token ranges stay inside the document
        #[test]
        fn ranges_within_document(export in arb_export()) {
            let doc = convert(export).unwrap();
            let n = doc.token_count();
            for m in &doc.mentions {
                let (b, e) = m.range();
                prop_assert!(b <= e && e <= n);
            }
            for ev in &doc.events {
                prop_assert!(ev.begin <= ev.end && ev.end <= n);
            }
        }
    }
}

mod head_invariants {
    use super::*;

    proptest! {
        /// INVARIANT: a head lies inside its mention and contains no nested
        /// record's full range
        #[test]
        fn heads_are_contained(export in arb_export()) {
            let doc = convert(export).unwrap();
            let ranges: HashMap<usize, (usize, usize)> = doc
                .mentions
                .iter()
                .map(|m| (m.id(), m.range()))
                .chain(doc.descriptors.iter().map(|d| (d.id, (d.begin, d.end))))
                .chain(doc.values.iter().map(|v| (v.id, (v.begin, v.end))))
                .collect();

            for m in &doc.mentions {
                let Some((hb, he)) = m.head() else { continue };
                let (b, e) = m.range();
                prop_assert!(b <= hb && hb < he && he <= e, "head {:?} outside {:?}", (hb, he), (b, e));

                for edge in doc.hierarchy.iter().filter(|e| e.parent == RecordRef::Record(m.id())) {
                    let (cb, ce) = ranges[&edge.child];
                    if cb < ce {
                        prop_assert!(
                            !(hb <= cb && ce <= he),
                            "head {:?} of {} contains child {} {:?}",
                            (hb, he), m.id(), edge.child, (cb, ce)
                        );
                    }
                }
            }
        }
    }
}
