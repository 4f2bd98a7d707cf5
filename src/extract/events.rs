//! Event extraction.
//!
//! # Stages
//!
//! ```text
//!   discovery ──► ids ──► anchors ──► role attachment ──► subevents ──► widening
//! ```
//!
//! - **Discovery**: every explicit event span, and every trigger whose
//!   parent is not an event span. Several unnumbered, unmarked triggers in
//!   one scope cannot be told apart; none of them becomes an event.
//! - **Ids** are assigned to all candidates before any role is looked at,
//!   so roles can point at events discovered later.
//! - **Roles** of a trigger event come from its siblings (looking through
//!   lists, whose role passes to their members); roles of a span event come
//!   from its descendants, stopping at nested event spans.
//! - **Subevents** group roles by their id path. A path that is a strict
//!   prefix of another is not a subevent of its own; its roles are copied
//!   into every longer path.
//! - **Widening** grows each event over the events its roles point at.

use super::ExtractionContext;
use crate::document::{Anchor, Event, RecordId, Role, RoleTarget, Subevent, Trigger};
use crate::label::decode_modifiers;
use crate::offset::TokenRange;
use crate::span::{EventLabel, RoleMarker, SpanKind};
use crate::tree::{NodeId, SpanTree, ROOT};
use crate::Result;
use std::collections::{HashMap, HashSet};

/// Deepest chain of event references followed while widening.
pub const MAX_EVENT_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Span,
    Trigger,
}

#[derive(Debug, Clone)]
struct Candidate {
    node: NodeId,
    source: Source,
    label: EventLabel,
    trigger: Option<NodeId>,
    scope: NodeId,
    id: RecordId,
}

#[derive(Debug, Clone)]
struct Carrier {
    node: NodeId,
    marker: RoleMarker,
    /// Node whose role string this is (a list for propagated roles).
    source: NodeId,
}

#[derive(Debug, Clone)]
struct AttachedRole {
    marker: RoleMarker,
    role: Role,
    range: Option<TokenRange>,
    event_ref: Option<usize>,
}

/// Discover events, assign their ids and attach roles.
pub fn extract_events(ctx: &mut ExtractionContext<'_>) -> Result<Vec<Event>> {
    let tree = ctx.tree;
    let order = tree.preorder();

    let mut candidates = discover(ctx, &order);

    for candidate in &mut candidates {
        candidate.id = ctx.assign(candidate.node, tree.node(candidate.node).range);
        if let Some(trigger) = candidate.trigger {
            ctx.alias(trigger, candidate.id);
        }
    }
    let by_id: HashMap<RecordId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();

    let anchors: Vec<Anchor> = candidates
        .iter()
        .map(|c| match c.source {
            Source::Span => Anchor::SelfSpan,
            Source::Trigger => tree
                .ancestors(c.node)
                .find_map(|a| ctx.id_of(a))
                .map_or(Anchor::Document, Anchor::Record),
        })
        .collect();

    // Numbered triggers and event counts per trigger scope.
    let mut scope_numbers: HashMap<NodeId, HashSet<u32>> = HashMap::new();
    let mut scope_sizes: HashMap<NodeId, usize> = HashMap::new();
    for c in candidates.iter().filter(|c| c.source == Source::Trigger) {
        *scope_sizes.entry(c.scope).or_default() += 1;
        if let Some(n) = c.label.number {
            scope_numbers.entry(c.scope).or_default().insert(n);
        }
    }

    let mut attached: HashSet<NodeId> = HashSet::new();
    let mut targets: HashMap<NodeId, (RoleTarget, Option<TokenRange>)> = HashMap::new();
    let mut roles: Vec<Vec<AttachedRole>> = Vec::with_capacity(candidates.len());
    let no_numbers = HashSet::new();

    for c in &candidates {
        let mut carriers = Vec::new();
        match c.source {
            Source::Trigger => collect_carriers(tree, c.scope, None, Some(c.node), false, &mut carriers),
            Source::Span => collect_carriers(tree, c.node, None, c.trigger, true, &mut carriers),
        }
        let numbers = scope_numbers.get(&c.scope).unwrap_or(&no_numbers);
        let size = scope_sizes.get(&c.scope).copied().unwrap_or(0);

        let mut list = Vec::new();
        for carrier in carriers {
            if !role_matches(c, &carrier.marker, numbers, size) {
                continue;
            }
            let (target, range) = targets
                .entry(carrier.node)
                .or_insert_with(|| role_target(ctx, carrier.node))
                .clone();
            if target == (RoleTarget::Record { id: c.id }) {
                ctx.diags.malformed(
                    tree.node(carrier.node).id_str(),
                    "role refers to its own event, ignored",
                );
                continue;
            }
            attached.insert(carrier.source);
            let event_ref = match &target {
                RoleTarget::Record { id } => by_id.get(id).copied(),
                RoleTarget::FreeText { .. } => None,
            };
            list.push(AttachedRole {
                role: Role {
                    role_type: carrier.marker.role_type.clone(),
                    target,
                },
                marker: carrier.marker,
                range,
                event_ref,
            });
        }
        roles.push(list);
    }

    let base: Vec<TokenRange> = candidates
        .iter()
        .zip(&roles)
        .map(|(c, attached_roles)| {
            let mut range = match c.source {
                Source::Span => tree.node(c.node).range,
                Source::Trigger => TokenRange::default(),
            };
            if let Some(t) = c.trigger {
                range = range.union(&tree.node(t).range);
            }
            for role in attached_roles.iter().filter(|r| r.event_ref.is_none()) {
                if let Some(r) = role.range {
                    range = range.union(&r);
                }
            }
            range
        })
        .collect();
    let refs: Vec<Vec<usize>> = roles
        .iter()
        .map(|rs| rs.iter().filter_map(|r| r.event_ref).collect())
        .collect();
    let widened = widen_ranges(ctx, &candidates, &base, &refs);

    let mut events = Vec::with_capacity(candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        let range = widened[i];
        ctx.set_range(c.id, range);
        let span_id = tree.node(c.node).id_str();
        let tense = decode_modifiers(&c.label.modifiers, ctx.schema, false, span_id, &mut ctx.diags).tense;
        let trigger_label = c.trigger.and_then(|t| match &tree.node(t).kind {
            SpanKind::Trigger(label) if t != c.node => Some(label),
            _ => None,
        });
        let event_type = c
            .label
            .event_type
            .clone()
            .or_else(|| trigger_label.and_then(|l| l.event_type.clone()));
        let trigger = c.trigger.map(|t| {
            let r = tree.node(t).range;
            Trigger {
                begin: r.begin,
                end: r.end,
                text: ctx.text.text_of(r),
            }
        });
        events.push(Event {
            id: c.id,
            event_type,
            tense,
            anchor: anchors[i],
            begin: range.begin,
            end: range.end,
            trigger,
            subevents: group_subevents(c.id, &roles[i]),
        });
    }

    for &node in &order {
        let n = tree.node(node);
        if let Some(role) = &n.role {
            if !attached.contains(&node) {
                ctx.diags.malformed(
                    n.id_str(),
                    format!("role {:?} never attached to an event", role.role_type),
                );
            }
        }
    }

    Ok(events)
}

/// Event candidates in document order.
fn discover(ctx: &mut ExtractionContext<'_>, order: &[NodeId]) -> Vec<Candidate> {
    let tree = ctx.tree;
    let ambiguous = ambiguous_triggers(ctx, order);
    let mut candidates = Vec::new();

    for &node in order {
        let n = tree.node(node);
        match &n.kind {
            SpanKind::EventSpan(label) => candidates.push(Candidate {
                node,
                source: Source::Span,
                label: label.clone(),
                trigger: first_trigger(tree, node),
                scope: node,
                id: 0,
            }),
            SpanKind::Trigger(label) => {
                let parent = n.parent.unwrap_or(ROOT);
                if matches!(tree.node(parent).kind, SpanKind::EventSpan(_)) {
                    if first_trigger(tree, parent) != Some(node) {
                        ctx.diags
                            .malformed(n.id_str(), "additional trigger inside event span ignored");
                    }
                    continue;
                }
                if ambiguous.contains(&node) {
                    continue;
                }
                candidates.push(Candidate {
                    node,
                    source: Source::Trigger,
                    label: label.clone(),
                    trigger: Some(node),
                    scope: parent,
                    id: 0,
                });
            }
            _ => {}
        }
    }
    candidates
}

fn first_trigger(tree: &SpanTree, node: NodeId) -> Option<NodeId> {
    tree.children(node)
        .iter()
        .copied()
        .find(|&c| matches!(tree.node(c).kind, SpanKind::Trigger(_)))
}

/// Unnumbered, unmarked triggers that share a scope with another one.
fn ambiguous_triggers(ctx: &mut ExtractionContext<'_>, order: &[NodeId]) -> HashSet<NodeId> {
    let tree = ctx.tree;
    let mut out = HashSet::new();
    for &node in order {
        if matches!(tree.node(node).kind, SpanKind::EventSpan(_)) {
            continue;
        }
        let unmarked: Vec<NodeId> = tree
            .children(node)
            .iter()
            .copied()
            .filter(|&c| {
                let child = tree.node(c);
                child.role.is_none()
                    && matches!(&child.kind, SpanKind::Trigger(label) if label.number.is_none())
            })
            .collect();
        if unmarked.len() > 1 {
            ctx.diags.violation(
                tree.node(node).id_str(),
                format!("{} unnumbered triggers in one scope, no event emitted", unmarked.len()),
            );
            out.extend(unmarked);
        }
    }
    out
}

/// Role carriers among the children of `node`.
///
/// Lists are looked through, passing their own role to their members.
/// With `descend`, other nodes are searched too, except nested event spans.
fn collect_carriers(
    tree: &SpanTree,
    node: NodeId,
    inherited: Option<(&RoleMarker, NodeId)>,
    skip: Option<NodeId>,
    descend: bool,
    out: &mut Vec<Carrier>,
) {
    for &child in tree.children(node) {
        if Some(child) == skip {
            continue;
        }
        let n = tree.node(child);
        let own = n.role.as_ref().map(|m| (m, child));
        let member = matches!(n.kind, SpanKind::Entity { .. } | SpanKind::List { .. });
        let marker = own.or(if member { inherited } else { None });
        let push = |out: &mut Vec<Carrier>, (m, source): (&RoleMarker, NodeId)| {
            out.push(Carrier {
                node: child,
                marker: m.clone(),
                source,
            });
        };
        match n.kind {
            SpanKind::EventSpan(_) => {
                if let Some(own) = own {
                    push(out, own);
                }
            }
            SpanKind::List { .. } => collect_carriers(tree, child, marker, skip, descend, out),
            _ => {
                if let Some(marker) = marker {
                    push(out, marker);
                }
                if descend {
                    collect_carriers(tree, child, None, skip, descend, out);
                }
            }
        }
    }
}

fn role_matches(c: &Candidate, marker: &RoleMarker, scope_numbers: &HashSet<u32>, scope_size: usize) -> bool {
    let wanted = marker.event_ref().map(|w| w.parse::<u32>().ok());
    match (c.source, c.label.number) {
        (Source::Span, None) => true,
        (Source::Span, Some(n)) => wanted.map_or(true, |w| w == Some(n)),
        (Source::Trigger, Some(n)) => match wanted {
            Some(w) => w == Some(n),
            None => scope_size == 1,
        },
        (Source::Trigger, None) => match wanted {
            None => true,
            Some(Some(w)) => !scope_numbers.contains(&w),
            Some(None) => true,
        },
    }
}

fn role_target(ctx: &mut ExtractionContext<'_>, node: NodeId) -> (RoleTarget, Option<TokenRange>) {
    let tree = ctx.tree;
    let n = tree.node(node);
    if n.kind != SpanKind::FreeText {
        if let Some(id) = ctx.id_of(node) {
            return (RoleTarget::Record { id }, ctx.range_of(id));
        }
        ctx.diags
            .notice(n.id_str(), "role filler has no record, kept as free text");
    }
    (
        RoleTarget::FreeText {
            begin: n.range.begin,
            end: n.range.end,
            text: ctx.text.text_of(n.range),
        },
        Some(n.range),
    )
}

fn group_subevents(event_id: RecordId, roles: &[AttachedRole]) -> Vec<Subevent> {
    let mut keys: Vec<&RoleMarker> = Vec::new();
    for role in roles {
        if !keys.iter().any(|k| k.path == role.marker.path) {
            keys.push(&role.marker);
        }
    }
    let maximal = keys.iter().filter(|k| {
        !keys
            .iter()
            .any(|o| o.path.len() > k.path.len() && o.path.starts_with(&k.path))
    });
    maximal
        .map(|key| Subevent {
            id: format!("{}.{}", event_id, key.subevent_key()),
            roles: roles
                .iter()
                .filter(|r| key.path.starts_with(&r.marker.path))
                .map(|r| r.role.clone())
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Grow every event over the events its roles reference, reporting cycles.
fn widen_ranges(
    ctx: &mut ExtractionContext<'_>,
    candidates: &[Candidate],
    base: &[TokenRange],
    refs: &[Vec<usize>],
) -> Vec<TokenRange> {
    let mut state = vec![Visit::New; base.len()];
    let mut out = base.to_vec();
    for i in 0..base.len() {
        widen(ctx, candidates, base, refs, i, 0, &mut state, &mut out);
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn widen(
    ctx: &mut ExtractionContext<'_>,
    candidates: &[Candidate],
    base: &[TokenRange],
    refs: &[Vec<usize>],
    i: usize,
    depth: usize,
    state: &mut [Visit],
    out: &mut [TokenRange],
) -> TokenRange {
    if state[i] == Visit::Done {
        return out[i];
    }
    let tree = ctx.tree;
    let span_id = tree.node(candidates[i].node).id_str();
    if depth > MAX_EVENT_DEPTH {
        ctx.diags.malformed(span_id, "event references nested too deeply, not widened");
        return base[i];
    }
    state[i] = Visit::Active;
    let mut range = base[i];
    for &j in &refs[i] {
        if state[j] == Visit::Active {
            ctx.diags.malformed(
                span_id,
                format!("cyclic reference to event {}", candidates[j].id),
            );
            continue;
        }
        range = range.union(&widen(ctx, candidates, base, refs, j, depth + 1, state, out));
    }
    state[i] = Visit::Done;
    out[i] = range;
    range
}
