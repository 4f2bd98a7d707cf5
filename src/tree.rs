//! Containment tree over classified spans.
//!
//! # Insertion
//!
//! ```text
//!   sorted spans (begin ↑, end ↓, descriptor first):
//!
//!     [lst ..................]        root
//!     [nam.per]                         └─ lst
//!               [nom.per ....]               ├─ nam.per
//!                     [head]                 └─ nom.per
//!                                                └─ head
//!
//!   For each span: walk up from the last inserted node while the span ends
//!   after the candidate parent, then append as its last child.
//! ```
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Character
//! offsets are converted to token ranges at attachment time; the builder
//! then restores sibling disjointness in token space, which stretching can
//! break. A descriptor that lands on exactly its parent's tokens is moved
//! above that parent.

use crate::diagnostics::Diagnostics;
use crate::offset::{Snap, TokenRange, TokenizedText};
use crate::span::{ClassifiedSpan, RoleMarker, SpanKind};

/// Index of a node in a [`SpanTree`].
pub type NodeId = usize;

/// The document root.
pub const ROOT: NodeId = 0;

/// A classified span placed in the tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Tool id of the span; `None` for the root.
    pub span_id: Option<String>,
    /// Kind and label fields.
    pub kind: SpanKind,
    /// Role marker, if any.
    pub role: Option<RoleMarker>,
    /// Character offsets in the (edited) text.
    pub chars: (usize, usize),
    /// Token range (half-open).
    pub range: TokenRange,
    /// Parent node; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Children in insertion order.
    pub children: Vec<NodeId>,
}

impl TreeNode {
    /// Span id for diagnostics.
    #[must_use]
    pub fn id_str(&self) -> Option<&str> {
        self.span_id.as_deref()
    }
}

/// Single-rooted arena tree.
#[derive(Debug, Clone)]
pub struct SpanTree {
    nodes: Vec<TreeNode>,
}

impl SpanTree {
    /// Build the tree. Spans whose kind produces no node are skipped.
    pub fn build(spans: Vec<ClassifiedSpan>, text: &TokenizedText, diags: &mut Diagnostics) -> Self {
        let mut tree = SpanTree {
            nodes: vec![TreeNode {
                span_id: None,
                kind: SpanKind::Root,
                role: None,
                chars: (0, text.char_len()),
                range: text.full_range(),
                parent: None,
                children: Vec::new(),
            }],
        };

        let mut spans: Vec<ClassifiedSpan> =
            spans.into_iter().filter(|s| s.kind.produces_node()).collect();
        spans.sort_by(|a, b| {
            a.begin
                .cmp(&b.begin)
                .then(b.end.cmp(&a.end))
                .then(a.kind.nesting_priority().cmp(&b.kind.nesting_priority()))
                .then(a.order.cmp(&b.order))
        });

        let mut current = ROOT;
        for span in spans {
            while current != ROOT && span.end > tree.nodes[current].chars.1 {
                current = tree.nodes[current].parent.unwrap_or(ROOT);
            }
            current = tree.attach(current, span, text, diags);
        }
        tree
    }

    fn attach(
        &mut self,
        parent: NodeId,
        span: ClassifiedSpan,
        text: &TokenizedText,
        diags: &mut Diagnostics,
    ) -> NodeId {
        let conv = text.convert(span.begin, span.end);
        let id = Some(span.id.as_str());
        if conv.begin == Snap::Stretched {
            diags.malformed(
                id,
                format!("start offset {} inside a token, stretched to token start", span.begin),
            );
        }
        match conv.end {
            Snap::Stretched => diags.malformed(
                id,
                format!("end offset {} inside a token, stretched to token end", span.end),
            ),
            Snap::Whitespace if span.end > span.begin => diags.notice(
                id,
                format!("end offset {} in whitespace, moved to previous token end", span.end),
            ),
            _ => {}
        }

        let parent_node = &self.nodes[parent];
        if parent != ROOT
            && parent_node.chars == (span.begin, span.end)
            && !matches!(parent_node.kind, SpanKind::Descriptor { .. })
        {
            diags.notice(
                id,
                format!(
                    "same offsets as {}, nested as its child",
                    parent_node.id_str().unwrap_or("?")
                ),
            );
        }

        // Children never leave their parent's token range.
        let bounds = parent_node.range;
        let mut range = clamp(conv.range, bounds);
        if !conv.range.is_empty() && range != conv.range {
            diags.malformed(id, "token range clipped to enclosing span");
        }

        // A descriptor stretched onto its parent's tokens still wins as ancestor.
        if matches!(span.kind, SpanKind::Descriptor { .. })
            && parent != ROOT
            && !range.is_empty()
            && range == self.nodes[parent].range
            && !matches!(self.nodes[parent].kind, SpanKind::Descriptor { .. })
        {
            return self.insert_above(parent, span, range);
        }

        // Empty ranges overlap nothing, and every fix either shrinks a head
        // or moves the new start right, so this terminates.
        while let Some(prev) = self.overlapping_child(parent, range) {
            let prev_range = self.nodes[prev].range;
            if self.nodes[prev].kind == SpanKind::Head && range.begin > prev_range.begin {
                diags.malformed(
                    self.nodes[prev].id_str(),
                    format!("head overlaps {}, head shrunk", span.id),
                );
                let shrunk = TokenRange::new(prev_range.begin, range.begin);
                self.clamp_subtree(prev, shrunk);
            } else {
                diags.malformed(
                    id,
                    format!(
                        "crosses {}, start clipped to its end",
                        self.nodes[prev].id_str().unwrap_or("?")
                    ),
                );
                range = TokenRange::new(prev_range.end, range.end);
            }
        }

        let node = self.nodes.len();
        self.nodes.push(TreeNode {
            span_id: Some(span.id),
            kind: span.kind,
            role: span.role,
            chars: (span.begin, span.end),
            range,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(node);
        node
    }

    /// Put `span` in place of `child` and make `child` its only child.
    /// Returns `child`, which stays the insertion point.
    fn insert_above(&mut self, child: NodeId, span: ClassifiedSpan, range: TokenRange) -> NodeId {
        let grandparent = self.nodes[child].parent.unwrap_or(ROOT);
        let node = self.nodes.len();
        self.nodes.push(TreeNode {
            span_id: Some(span.id),
            kind: span.kind,
            role: span.role,
            chars: (span.begin, span.end),
            range,
            parent: Some(grandparent),
            children: vec![child],
        });
        if let Some(slot) = self.nodes[grandparent].children.iter_mut().find(|c| **c == child) {
            *slot = node;
        }
        self.nodes[child].parent = Some(node);
        child
    }

    fn overlapping_child(&self, parent: NodeId, range: TokenRange) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .rev()
            .copied()
            .find(|&c| self.nodes[c].range.overlaps(&range))
    }

    fn clamp_subtree(&mut self, node: NodeId, bounds: TokenRange) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let range = if n == node { bounds } else { clamp(self.nodes[n].range, bounds) };
            self.nodes[n].range = range;
            stack.extend(self.nodes[n].children.iter().copied());
        }
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    /// Children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Strict ancestors, nearest first, ending with the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id].parent, move |&n| self.nodes[n].parent)
    }

    /// All nodes in pre-order (document order), root first.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        self.descendants_with_self(ROOT)
    }

    /// `id` followed by its descendants in pre-order.
    #[must_use]
    pub fn descendants_with_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev().copied());
        }
        out
    }

    /// Look up a node by tool span id.
    #[must_use]
    pub fn find_span(&self, span_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.span_id.as_deref() == Some(span_id))
    }
}

fn clamp(range: TokenRange, bounds: TokenRange) -> TokenRange {
    let begin = range.begin.clamp(bounds.begin, bounds.end);
    let end = range.end.clamp(bounds.begin, bounds.end);
    TokenRange::new(begin, end)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::input::RawSpan;
    use crate::schema::default_schema;
    use crate::span::classify;
    use proptest::prelude::*;

    const LABELS: &[&str] = &["nam.per", "nom.obj", "lst", "desc.role", "head", "att.alias", "val"];

    fn spans_strategy(len: usize) -> impl Strategy<Value = Vec<RawSpan>> {
        prop::collection::vec((0..=len, 0..=len, 0..LABELS.len()), 0..12).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (a, b, l))| RawSpan::new(format!("s{i}"), a.min(b), a.max(b), LABELS[l]))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn containment_and_sibling_disjointness(
            (text, spans) in "[a-z]{1,4}( [a-z]{1,4}){0,6}"
                .prop_flat_map(|t| { let n = t.chars().count(); (Just(t), spans_strategy(n)) })
        ) {
            let mut diags = Diagnostics::new();
            let tokenized = TokenizedText::segment(&text);
            let classified = spans
                .iter()
                .enumerate()
                .map(|(i, s)| classify(s, i, default_schema(), &mut diags))
                .collect();
            let tree = SpanTree::build(classified, &tokenized, &mut diags);

            for id in 0..tree.len() {
                let node = tree.node(id);
                for &child in &node.children {
                    prop_assert!(node.range.contains(&tree.node(child).range));
                    prop_assert_eq!(tree.node(child).parent, Some(id));
                }
                for (i, &a) in node.children.iter().enumerate() {
                    for &b in &node.children[i + 1..] {
                        let (a, b) = (tree.node(a).range, tree.node(b).range);
                        prop_assert!(!a.overlaps(&b), "siblings {:?} and {:?} overlap", a, b);
                    }
                }
            }
        }
    }
}
