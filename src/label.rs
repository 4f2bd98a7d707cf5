//! Label decoding: modifiers, coreference, attribute inheritance, heads.
//!
//! # Resolution Rules
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────────────┐
//! │ Node         │ Entity type comes from                                │
//! ├──────────────┼───────────────────────────────────────────────────────┤
//! │ nam.per      │ its own second segment (normalized)                   │
//! │ pro          │ the mention its coreference relation points at,       │
//! │              │ followed through further abbreviated mentions         │
//! │              │ and lists (first member)                              │
//! │ att.alias    │ the nearest entity / list / attribute ancestor        │
//! │              │ (heads and descriptors are transparent)               │
//! └──────────────┴───────────────────────────────────────────────────────┘
//! ```
//!
//! Coreference chains can be cyclic in bad input. Resolution keeps the set
//! of nodes being resolved and gives up (with a diagnostic and the unknown
//! type) on a revisit or past [`MAX_COREF_DEPTH`].

use crate::diagnostics::Diagnostics;
use crate::input::RawRelation;
use crate::offset::TokenRange;
use crate::schema::{CompiledSchema, ModifierCategory};
use crate::span::SpanKind;
use crate::tree::{NodeId, SpanTree};
use std::collections::{HashMap, HashSet};

/// Longest coreference chain followed before giving up.
pub const MAX_COREF_DEPTH: usize = 32;

// =============================================================================
// Modifiers
// =============================================================================

/// Decoded trailing label segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Grammatical number.
    pub number: Option<String>,
    /// Specificity.
    pub specificity: Option<String>,
    /// Tense.
    pub tense: Option<String>,
    /// Relation types marked on the label.
    pub relation_types: Vec<String>,
    /// Whether the pronoun marker was present.
    pub pronoun: bool,
}

/// Decode modifier segments. The first segment of each category wins;
/// unknown segments are reported and ignored.
pub fn decode_modifiers(
    segments: &[String],
    schema: &CompiledSchema,
    allow_pronoun_marker: bool,
    span_id: Option<&str>,
    diags: &mut Diagnostics,
) -> Modifiers {
    let mut out = Modifiers::default();
    for segment in segments {
        if allow_pronoun_marker && *segment == schema.pronoun_marker {
            out.pronoun = true;
            continue;
        }
        match schema.modifier_category(segment) {
            Some(ModifierCategory::Number) => {
                out.number.get_or_insert_with(|| segment.clone());
            }
            Some(ModifierCategory::Specificity) => {
                out.specificity.get_or_insert_with(|| segment.clone());
            }
            Some(ModifierCategory::Tense) => {
                out.tense.get_or_insert_with(|| segment.clone());
            }
            Some(ModifierCategory::RelationMarker) => {
                if !out.relation_types.contains(segment) {
                    out.relation_types.push(segment.clone());
                }
            }
            Some(ModifierCategory::Other) => {}
            None => diags.malformed(span_id, format!("unknown label segment {:?} ignored", segment)),
        }
    }
    out
}

// =============================================================================
// Decoded records
// =============================================================================

/// Decoded entity (reference) label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    /// Mention type.
    pub mention_type: String,
    /// Normalized entity type (own, inherited through coreference, or the
    /// unknown fallback).
    pub entity_type: String,
    /// Grammatical number.
    pub number: Option<String>,
    /// Specificity.
    pub specificity: Option<String>,
    /// Tense.
    pub tense: Option<String>,
    /// Relation types marked on the label.
    pub relation_types: Vec<String>,
    /// Whether the entity type is known.
    pub resolved: bool,
}

/// Decoded attribute label with its inherited entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// `name_type` for aliases, `pronoun_type` with the pronoun marker,
    /// `nominal_type` otherwise.
    pub mention_type: String,
    /// Inherited entity type.
    pub entity_type: String,
    /// Attribute subtype.
    pub subtype: Option<String>,
    /// Grammatical number.
    pub number: Option<String>,
    /// Specificity.
    pub specificity: Option<String>,
    /// Tense.
    pub tense: Option<String>,
    /// Node the entity type was inherited from.
    pub inherited_from: NodeId,
}

// =============================================================================
// Decoder
// =============================================================================

/// Memoizing label decoder for one document.
pub struct LabelDecoder<'a> {
    schema: &'a CompiledSchema,
    tree: &'a SpanTree,
    coref_out: HashMap<NodeId, Vec<NodeId>>,
    coref_in: HashMap<NodeId, Vec<NodeId>>,
    entities: HashMap<NodeId, EntityInfo>,
    attributes: HashMap<NodeId, Option<AttributeInfo>>,
    resolving: HashSet<NodeId>,
}

impl<'a> LabelDecoder<'a> {
    /// Index the coreference relations of a document.
    #[must_use]
    pub fn new(
        schema: &'a CompiledSchema,
        tree: &'a SpanTree,
        span_index: &HashMap<String, NodeId>,
        relations: &[RawRelation],
    ) -> Self {
        let mut coref_out: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut coref_in: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for rel in relations {
            let Some(label) = rel.label.as_deref() else { continue };
            if !schema.is_coreference(label) {
                continue;
            }
            if let (Some(&src), Some(&tgt)) = (span_index.get(&rel.source), span_index.get(&rel.target)) {
                coref_out.entry(src).or_default().push(tgt);
                coref_in.entry(tgt).or_default().push(src);
            }
        }
        Self {
            schema,
            tree,
            coref_out,
            coref_in,
            entities: HashMap::new(),
            attributes: HashMap::new(),
            resolving: HashSet::new(),
        }
    }

    /// Decode an entity node, resolving abbreviated mentions through
    /// coreference. Returns `None` for other kinds.
    pub fn entity(&mut self, node: NodeId, diags: &mut Diagnostics) -> Option<EntityInfo> {
        if let Some(info) = self.entities.get(&node) {
            return Some(info.clone());
        }
        let tree = self.tree;
        let n = tree.node(node);
        let SpanKind::Entity {
            mention_type,
            entity_type,
            modifiers,
        } = &n.kind
        else {
            return None;
        };
        let span_id = n.id_str();
        let mods = decode_modifiers(modifiers, self.schema, false, span_id, diags);

        let mut info = EntityInfo {
            mention_type: mention_type.clone(),
            entity_type: self.schema.unknown_entity_type.clone(),
            number: mods.number,
            specificity: mods.specificity,
            tense: mods.tense,
            relation_types: mods.relation_types,
            resolved: false,
        };

        match entity_type {
            Some(raw) => {
                info.entity_type = self.schema.normalize_entity_type(raw);
                info.resolved = true;
            }
            None => {
                if let Some(found) = self.follow_coreference(node, diags) {
                    info.entity_type = found.entity_type;
                    info.number = info.number.or(found.number);
                    info.specificity = info.specificity.or(found.specificity);
                    info.resolved = true;
                }
            }
        }

        self.entities.insert(node, info.clone());
        Some(info)
    }

    /// Entity type and modifiers of the mention an abbreviated mention
    /// corefers with.
    fn follow_coreference(&mut self, node: NodeId, diags: &mut Diagnostics) -> Option<Resolved> {
        let tree = self.tree;
        let span_id = tree.node(node).id_str();
        let target = match self.coref_out.get(&node).and_then(|t| t.first()) {
            Some(&t) => t,
            None => match self.coref_in.get(&node).and_then(|s| s.first()) {
                Some(&s) => {
                    diags.notice(span_id, "coreference found only as relation target");
                    s
                }
                None => {
                    diags.malformed(span_id, "abbreviated mention has no coreference relation");
                    return None;
                }
            },
        };

        if self.resolving.contains(&target) || self.resolving.len() >= MAX_COREF_DEPTH {
            diags.malformed(span_id, "coreference chain is cyclic or too deep");
            return None;
        }
        self.resolving.insert(node);
        let found = self.resolve_target(target, diags);
        self.resolving.remove(&node);

        if found.is_none() {
            diags.malformed(
                span_id,
                format!(
                    "coreference target {} has no entity type",
                    tree.node(target).id_str().unwrap_or("?")
                ),
            );
        }
        found
    }

    fn resolve_target(&mut self, target: NodeId, diags: &mut Diagnostics) -> Option<Resolved> {
        let tree = self.tree;
        match tree.node(target).kind {
            SpanKind::Entity { .. } => self.entity(target, diags).filter(|e| e.resolved).map(|e| Resolved {
                entity_type: e.entity_type,
                number: e.number,
                specificity: e.specificity,
            }),
            SpanKind::List { .. } => self.list_first_type(target, diags).map(|entity_type| Resolved {
                entity_type,
                number: None,
                specificity: None,
            }),
            SpanKind::Attribute { .. } => self.attribute(target, diags).map(|a| Resolved {
                entity_type: a.entity_type,
                number: a.number,
                specificity: a.specificity,
            }),
            _ => None,
        }
    }

    /// Members of a list: direct entity and list children.
    #[must_use]
    pub fn list_members(&self, list: NodeId) -> Vec<NodeId> {
        self.tree
            .children(list)
            .iter()
            .copied()
            .filter(|&c| {
                matches!(
                    self.tree.node(c).kind,
                    SpanKind::Entity { .. } | SpanKind::List { .. }
                )
            })
            .collect()
    }

    /// Entity type of the first member of a list, descending into nested
    /// lists.
    pub fn list_first_type(&mut self, list: NodeId, diags: &mut Diagnostics) -> Option<String> {
        let tree = self.tree;
        let first = *self.list_members(list).first()?;
        match tree.node(first).kind {
            SpanKind::List { .. } => self.list_first_type(first, diags),
            _ => self.entity(first, diags).map(|e| e.entity_type),
        }
    }

    /// Entity types of all members, nested lists flattened, first
    /// occurrence order.
    pub fn list_types(&mut self, list: NodeId, diags: &mut Diagnostics) -> Vec<String> {
        let tree = self.tree;
        let mut out: Vec<String> = Vec::new();
        for member in self.list_members(list) {
            let types = match tree.node(member).kind {
                SpanKind::List { .. } => self.list_types(member, diags),
                _ => self.entity(member, diags).map(|e| vec![e.entity_type]).unwrap_or_default(),
            };
            for t in types {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
        }
        out
    }

    /// Decode an attribute node. `None` if it has no mention to qualify
    /// (the attribute is dropped) or the node is not an attribute.
    pub fn attribute(&mut self, node: NodeId, diags: &mut Diagnostics) -> Option<AttributeInfo> {
        if let Some(info) = self.attributes.get(&node) {
            return info.clone();
        }
        let tree = self.tree;
        let n = tree.node(node);
        let SpanKind::Attribute { subtype, modifiers } = &n.kind else {
            return None;
        };
        let span_id = n.id_str();
        if !self.resolving.insert(node) {
            diags.malformed(span_id, "cyclic attribute resolution");
            return None;
        }

        let inherited = self.inherit(node, diags);
        let info = inherited.map(|(inherited_from, entity_type)| {
            let mods = decode_modifiers(modifiers, self.schema, true, span_id, diags);
            let schema = self.schema;
            let mention_type = if subtype.as_deref() == Some(schema.alias_subtype.as_str()) {
                schema.name_type.clone()
            } else if mods.pronoun {
                schema.pronoun_type.clone()
            } else {
                schema.nominal_type.clone()
            };
            AttributeInfo {
                mention_type,
                entity_type,
                subtype: subtype.clone(),
                number: mods.number,
                specificity: mods.specificity,
                tense: mods.tense,
                inherited_from,
            }
        });

        self.resolving.remove(&node);
        self.attributes.insert(node, info.clone());
        info
    }

    fn inherit(&mut self, node: NodeId, diags: &mut Diagnostics) -> Option<(NodeId, String)> {
        let tree = self.tree;
        let span_id = tree.node(node).id_str();
        for ancestor in tree.ancestors(node) {
            match tree.node(ancestor).kind {
                SpanKind::Entity { .. } => {
                    let info = self.entity(ancestor, diags)?;
                    return Some((ancestor, info.entity_type));
                }
                SpanKind::List { .. } => {
                    let entity_type = self
                        .list_first_type(ancestor, diags)
                        .unwrap_or_else(|| self.schema.unknown_entity_type.clone());
                    return Some((ancestor, entity_type));
                }
                SpanKind::Attribute { .. } => {
                    return match self.attribute(ancestor, diags) {
                        Some(parent) => Some((ancestor, parent.entity_type)),
                        None => {
                            diags.violation(span_id, "enclosing attribute was dropped, attribute dropped");
                            None
                        }
                    };
                }
                SpanKind::Root => {
                    diags.violation(span_id, "attribute outside any mention, attribute dropped");
                    return None;
                }
                _ => {}
            }
        }
        None
    }
}

struct Resolved {
    entity_type: String,
    number: Option<String>,
    specificity: Option<String>,
}

// =============================================================================
// Heads
// =============================================================================

/// Head token range of a mention node.
///
/// Without a head child: the whole span if the node has no children,
/// otherwise the first token no child covers (empty if every token is
/// covered). With a head child: the head, shrunk so that it does not
/// overlap any sibling.
pub fn resolve_head(tree: &SpanTree, node: NodeId, diags: &mut Diagnostics) -> Option<TokenRange> {
    let n = tree.node(node);
    let span_id = n.id_str();
    if n.range.is_empty() {
        return None;
    }
    let children = tree.children(node);
    let heads: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|&c| tree.node(c).kind == SpanKind::Head)
        .collect();

    let Some(&head) = heads.first() else {
        if children.is_empty() {
            return Some(n.range);
        }
        let covered = |t: usize| {
            children
                .iter()
                .any(|&c| tree.node(c).range.as_range().contains(&t))
        };
        return match n.range.as_range().find(|&t| !covered(t)) {
            Some(t) => {
                diags.notice(span_id, format!("no head annotated, using token {}", t));
                Some(TokenRange::new(t, t + 1))
            }
            None => {
                diags.notice(span_id, "no head annotated and every token is nested, head left empty");
                None
            }
        };
    };

    if heads.len() > 1 {
        diags.malformed(span_id, format!("{} heads annotated, using the first", heads.len()));
    }
    let mut range = tree.node(head).range;
    let nested = tree.children(head);
    if !nested.is_empty() {
        let free = range
            .as_range()
            .find(|&t| !nested.iter().any(|&c| tree.node(c).range.as_range().contains(&t)));
        range = free.map_or(TokenRange::new(range.begin, range.begin), |t| TokenRange::new(t, t + 1));
        diags.malformed(
            tree.node(head).id_str(),
            "head contains nested annotations, reduced to its first free token",
        );
    }
    for &sibling in children.iter().filter(|&&c| c != head) {
        let other = tree.node(sibling).range;
        if other.is_empty() || !other.overlaps(&range) {
            continue;
        }
        range = if other.begin > range.begin {
            TokenRange::new(range.begin, other.begin)
        } else {
            TokenRange::new(other.end, range.end)
        };
        diags.malformed(
            tree.node(head).id_str(),
            format!(
                "head overlaps {}, shrunk",
                tree.node(sibling).id_str().unwrap_or("?")
            ),
        );
    }
    (!range.is_empty()).then_some(range)
}
