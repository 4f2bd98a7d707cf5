//! Output document model.
//!
//! Every record that other records can point at (mentions, descriptors,
//! values, events) carries an id from one dense, per-document id space.
//! Ids are assigned in a fixed order, which exporters rely on:
//!
//! ```text
//!   lists  <  references  <  attributes  <  descriptors  <  values  <  events
//! ```

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::offset::Line;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Record id.
pub type RecordId = usize;

// =============================================================================
// References
// =============================================================================

/// A hierarchy parent: a record or the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RefRepr", into = "RefRepr")]
pub enum RecordRef {
    /// The document root (`"doc"`).
    Document,
    /// A record id.
    Record(RecordId),
}

/// What an event is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RefRepr", into = "RefRepr")]
pub enum Anchor {
    /// Explicit event span (`"self"`).
    SelfSpan,
    /// The document root (`"doc"`).
    Document,
    /// The record the trigger was found in.
    Record(RecordId),
}

const DOC: &str = "doc";
const SELF: &str = "self";

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RefRepr {
    Id(RecordId),
    Name(String),
}

impl From<RecordRef> for RefRepr {
    fn from(value: RecordRef) -> Self {
        match value {
            RecordRef::Document => RefRepr::Name(DOC.into()),
            RecordRef::Record(id) => RefRepr::Id(id),
        }
    }
}

impl TryFrom<RefRepr> for RecordRef {
    type Error = String;

    fn try_from(value: RefRepr) -> std::result::Result<Self, Self::Error> {
        match value {
            RefRepr::Id(id) => Ok(RecordRef::Record(id)),
            RefRepr::Name(name) if name == DOC => Ok(RecordRef::Document),
            RefRepr::Name(other) => Err(format!("expected record id or \"doc\", got {:?}", other)),
        }
    }
}

impl From<Anchor> for RefRepr {
    fn from(value: Anchor) -> Self {
        match value {
            Anchor::SelfSpan => RefRepr::Name(SELF.into()),
            Anchor::Document => RefRepr::Name(DOC.into()),
            Anchor::Record(id) => RefRepr::Id(id),
        }
    }
}

impl TryFrom<RefRepr> for Anchor {
    type Error = String;

    fn try_from(value: RefRepr) -> std::result::Result<Self, Self::Error> {
        match value {
            RefRepr::Id(id) => Ok(Anchor::Record(id)),
            RefRepr::Name(name) if name == DOC => Ok(Anchor::Document),
            RefRepr::Name(name) if name == SELF => Ok(Anchor::SelfSpan),
            RefRepr::Name(other) => Err(format!(
                "expected record id, \"doc\" or \"self\", got {:?}",
                other
            )),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Document => f.write_str(DOC),
            RecordRef::Record(id) => write!(f, "{}", id),
        }
    }
}

// =============================================================================
// Mentions
// =============================================================================

/// A list of mentions (`lst`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMention {
    /// Record id.
    pub id: RecordId,
    /// List subtype, if labeled.
    pub subtype: Option<String>,
    /// Entity types of the members, nested lists flattened.
    pub entity_types: Vec<String>,
    /// Token index (start, inclusive).
    pub begin: usize,
    /// Token index (end, exclusive).
    pub end: usize,
    /// Covered text.
    pub text: String,
}

/// A mention of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Record id.
    pub id: RecordId,
    /// Mention type (`nam`, `nom`, `pro`, ...).
    pub mention_type: String,
    /// Normalized entity type.
    pub entity_type: String,
    /// Grammatical number.
    pub number: Option<String>,
    /// Specificity.
    pub specificity: Option<String>,
    /// Tense.
    pub tense: Option<String>,
    /// Token index (start, inclusive).
    pub begin: usize,
    /// Token index (end, exclusive).
    pub end: usize,
    /// Head token range; `None` when no head could be determined.
    pub head: Option<(usize, usize)>,
    /// Covered text.
    pub text: String,
    /// Head text (empty without a head).
    pub head_text: String,
}

/// An attribute of an enclosing mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Record id.
    pub id: RecordId,
    /// Mention type derived from the subtype and markers.
    pub mention_type: String,
    /// Entity type inherited from the enclosing mention.
    pub entity_type: String,
    /// Attribute subtype.
    pub subtype: Option<String>,
    /// Grammatical number.
    pub number: Option<String>,
    /// Specificity.
    pub specificity: Option<String>,
    /// Tense.
    pub tense: Option<String>,
    /// Token index (start, inclusive).
    pub begin: usize,
    /// Token index (end, exclusive).
    pub end: usize,
    /// Head token range.
    pub head: Option<(usize, usize)>,
    /// Covered text.
    pub text: String,
    /// Head text.
    pub head_text: String,
}

/// Mention-like record, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mention {
    /// List.
    List(ListMention),
    /// Reference.
    Reference(Reference),
    /// Attribute.
    Attribute(Attribute),
}

impl Mention {
    /// Record id.
    #[must_use]
    pub fn id(&self) -> RecordId {
        match self {
            Mention::List(m) => m.id,
            Mention::Reference(m) => m.id,
            Mention::Attribute(m) => m.id,
        }
    }

    /// Token range `(begin, end)`.
    #[must_use]
    pub fn range(&self) -> (usize, usize) {
        match self {
            Mention::List(m) => (m.begin, m.end),
            Mention::Reference(m) => (m.begin, m.end),
            Mention::Attribute(m) => (m.begin, m.end),
        }
    }

    /// Entity type (first member type for lists).
    #[must_use]
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Mention::List(m) => m.entity_types.first().map(String::as_str),
            Mention::Reference(m) => Some(&m.entity_type),
            Mention::Attribute(m) => Some(&m.entity_type),
        }
    }

    /// Head token range, if the mention kind has one.
    #[must_use]
    pub fn head(&self) -> Option<(usize, usize)> {
        match self {
            Mention::List(_) => None,
            Mention::Reference(m) => m.head,
            Mention::Attribute(m) => m.head,
        }
    }
}

// =============================================================================
// Descriptors and values
// =============================================================================

/// A descriptor of a mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Record id.
    pub id: RecordId,
    /// Descriptor type.
    pub desc_type: Option<String>,
    /// Described mention, if one could be found.
    pub target: Option<RecordId>,
    /// Token index (start, inclusive).
    pub begin: usize,
    /// Token index (end, exclusive).
    pub end: usize,
    /// Covered text.
    pub text: String,
}

/// A value (date, amount, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// Record id.
    pub id: RecordId,
    /// Value type.
    pub value_type: String,
    /// Token index (start, inclusive).
    pub begin: usize,
    /// Token index (end, exclusive).
    pub end: usize,
    /// Covered text.
    pub text: String,
}

// =============================================================================
// Events
// =============================================================================

/// The word(s) signalling an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Token index (start, inclusive).
    pub begin: usize,
    /// Token index (end, exclusive).
    pub end: usize,
    /// Covered text.
    pub text: String,
}

/// What a role points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleTarget {
    /// Another record (mention, descriptor, value or event).
    Record {
        /// Record id.
        id: RecordId,
    },
    /// Inline free text.
    FreeText {
        /// Token index (start, inclusive).
        begin: usize,
        /// Token index (end, exclusive).
        end: usize,
        /// Covered text.
        text: String,
    },
}

/// One role of a subevent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role type (`buyer`, `price`, ...).
    pub role_type: String,
    /// Filler.
    pub target: RoleTarget,
}

/// A group of roles sharing a role-id path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subevent {
    /// `"<event id>.<path>"`.
    pub id: String,
    /// Roles, in attachment order.
    pub roles: Vec<Role>,
}

/// An event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Record id.
    pub id: RecordId,
    /// Event type.
    pub event_type: Option<String>,
    /// Tense.
    pub tense: Option<String>,
    /// Attachment point.
    pub anchor: Anchor,
    /// Token index (start, inclusive), widened over roles and
    /// referenced events.
    pub begin: usize,
    /// Token index (end, exclusive).
    pub end: usize,
    /// Trigger, if any.
    pub trigger: Option<Trigger>,
    /// Role groups.
    pub subevents: Vec<Subevent>,
}

impl Event {
    /// All roles across subevents; a role shared by several subevents is
    /// yielded once per subevent.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.subevents.iter().flat_map(|s| s.roles.iter())
    }
}

// =============================================================================
// Relations and hierarchy
// =============================================================================

/// Where a relation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOrigin {
    /// An annotated relation.
    Explicit,
    /// Relation marker on an entity label, to its nested mentions.
    Nested,
    /// Attribute to its nested mentions.
    Attribute,
    /// Attribute to the mention it qualifies.
    AttributeParent,
    /// Descriptor to its nested mentions.
    Descriptor,
}

/// A directed relation between two records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Source record.
    pub source: RecordId,
    /// Target record.
    pub target: RecordId,
    /// Relation type.
    pub relation_type: String,
    /// Tense.
    pub tense: Option<String>,
    /// Provenance.
    pub origin: RelationOrigin,
}

/// One containment edge between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEdge {
    /// Nearest enclosing record, or the document.
    pub parent: RecordRef,
    /// Contained record.
    pub child: RecordId,
}

// =============================================================================
// Document
// =============================================================================

/// A converted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier from the export.
    pub id: Option<String>,
    /// Lines and tokens of the (edited) text.
    pub lines: Vec<Line>,
    /// Lists, then references, then attributes.
    pub mentions: Vec<Mention>,
    /// Descriptors.
    pub descriptors: Vec<Descriptor>,
    /// Values.
    pub values: Vec<Value>,
    /// Events.
    pub events: Vec<Event>,
    /// Relations.
    pub relations: Vec<Relation>,
    /// Containment edges.
    pub hierarchy: Vec<HierarchyEdge>,
    /// Anomalies found while converting.
    pub diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Mention by id.
    #[must_use]
    pub fn mention(&self, id: RecordId) -> Option<&Mention> {
        self.mentions.iter().find(|m| m.id() == id)
    }

    /// Event by id.
    #[must_use]
    pub fn event(&self, id: RecordId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// All references.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.mentions.iter().filter_map(|m| match m {
            Mention::Reference(r) => Some(r),
            _ => None,
        })
    }

    /// Reference whose text equals `text`.
    #[must_use]
    pub fn reference_by_text(&self, text: &str) -> Option<&Reference> {
        self.references().find(|r| r.text == text)
    }

    /// Ids of all records, in id order.
    #[must_use]
    pub fn record_ids(&self) -> BTreeSet<RecordId> {
        self.mentions
            .iter()
            .map(Mention::id)
            .chain(self.descriptors.iter().map(|d| d.id))
            .chain(self.values.iter().map(|v| v.id))
            .chain(self.events.iter().map(|e| e.id))
            .collect()
    }

    /// Number of tokens.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.lines.iter().map(|l| l.tokens.len()).sum()
    }

    /// Diagnostics of one kind.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Whether any diagnostic is a schema violation.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        self.diagnostics_of(DiagnosticKind::SchemaViolation).next().is_some()
    }

    /// Serialize to JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.map_err(Error::from)
    }

    /// Parse a previously written document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refs_serialize_as_number_or_sentinel() {
        let edges = vec![
            HierarchyEdge { parent: RecordRef::Document, child: 0 },
            HierarchyEdge { parent: RecordRef::Record(0), child: 1 },
        ];
        let json = serde_json::to_string(&edges).unwrap();
        assert_eq!(json, r#"[{"parent":"doc","child":0},{"parent":0,"child":1}]"#);

        let back: Vec<HierarchyEdge> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edges);
    }

    #[test]
    fn test_anchor_self_and_rejects_unknown_name() {
        assert_eq!(serde_json::to_string(&Anchor::SelfSpan).unwrap(), "\"self\"");
        assert_eq!(serde_json::from_str::<Anchor>("7").unwrap(), Anchor::Record(7));
        assert!(serde_json::from_str::<Anchor>("\"root\"").is_err());
        assert!(serde_json::from_str::<RecordRef>("\"self\"").is_err());
    }

    #[test]
    fn test_mention_kind_tag() {
        let m = Mention::List(ListMention {
            id: 0,
            subtype: None,
            entity_types: vec!["per".into()],
            begin: 0,
            end: 3,
            text: "Anna and Ben".into(),
        });
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["kind"], "list");
        assert_eq!(m.entity_type(), Some("per"));
    }
}
