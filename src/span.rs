//! Span classification.
//!
//! Each raw span is classified exactly once. The kind carries only the label
//! fields valid for it, so later stages match on [`SpanKind`] instead of
//! re-probing label strings.

use crate::diagnostics::Diagnostics;
use crate::input::RawSpan;
use crate::schema::CompiledSchema;
use serde::{Deserialize, Serialize};

/// What a span annotates, with the label segments that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    /// Document root (never produced by classification).
    Root,
    /// Mention of an entity (`nam.per.plural`).
    Entity {
        /// First segment (`nam`, `pro`, ...).
        mention_type: String,
        /// Second segment, absent on abbreviated mentions.
        entity_type: Option<String>,
        /// Remaining segments.
        modifiers: Vec<String>,
    },
    /// List of mentions (`lst.conj`).
    List {
        /// Optional subtype.
        subtype: Option<String>,
    },
    /// Attribute of the enclosing mention (`att.alias`).
    Attribute {
        /// Attribute subtype.
        subtype: Option<String>,
        /// Remaining segments.
        modifiers: Vec<String>,
    },
    /// Descriptor (`desc.occupation`).
    Descriptor {
        /// Descriptor type.
        desc_type: Option<String>,
    },
    /// Explicit head of the enclosing mention.
    Head,
    /// Value (`val.date`).
    Value {
        /// Value type; the tag itself when no type segment is given.
        value_type: String,
    },
    /// Event trigger (`ev1.sale`).
    Trigger(EventLabel),
    /// Explicit event extent (`evs.sale`).
    EventSpan(EventLabel),
    /// Unlabeled span carrying only a role marker.
    FreeText,
    /// Span with neither label nor role.
    Unlabeled,
    /// Ignorable tag; no node is built.
    Ignored,
    /// Unknown first segment; no node is built.
    Unrecognized,
}

impl SpanKind {
    /// Whether the tree builder creates a node for this kind.
    #[must_use]
    pub const fn produces_node(&self) -> bool {
        !matches!(self, SpanKind::Ignored | SpanKind::Unrecognized | SpanKind::Root)
    }

    /// Sort priority among spans with identical offsets; lower sorts first
    /// and therefore becomes the ancestor.
    #[must_use]
    pub const fn nesting_priority(&self) -> u8 {
        match self {
            SpanKind::Descriptor { .. } => 0,
            _ => 1,
        }
    }

    /// Mention-like kinds that take part in the hierarchy.
    #[must_use]
    pub const fn is_hierarchical(&self) -> bool {
        matches!(
            self,
            SpanKind::Entity { .. }
                | SpanKind::List { .. }
                | SpanKind::Attribute { .. }
                | SpanKind::Descriptor { .. }
                | SpanKind::Value { .. }
        )
    }

    /// Short name for log lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            SpanKind::Root => "root",
            SpanKind::Entity { .. } => "entity",
            SpanKind::List { .. } => "list",
            SpanKind::Attribute { .. } => "attribute",
            SpanKind::Descriptor { .. } => "descriptor",
            SpanKind::Head => "head",
            SpanKind::Value { .. } => "value",
            SpanKind::Trigger(_) => "trigger",
            SpanKind::EventSpan(_) => "event-span",
            SpanKind::FreeText => "freetext",
            SpanKind::Unlabeled => "unlabeled",
            SpanKind::Ignored => "ignored",
            SpanKind::Unrecognized => "unrecognized",
        }
    }
}

/// Label fields shared by triggers and event spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLabel {
    /// Event number (`ev2` → 2); `None` for the single event of a scope.
    pub number: Option<u32>,
    /// Event type.
    pub event_type: Option<String>,
    /// Remaining segments.
    pub modifiers: Vec<String>,
}

/// Parsed role marker: `buyer.1.2` → type `buyer`, path `["1", "2"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleMarker {
    /// Role type.
    pub role_type: String,
    /// Id path; the first element names the event, the whole path the
    /// subevent.
    pub path: Vec<String>,
}

impl RoleMarker {
    /// Parse a role string; `None` if it has no type.
    #[must_use]
    pub fn parse(role: &str) -> Option<Self> {
        let lowered = role.trim().to_lowercase();
        let mut segments = lowered.split('.').map(str::trim);
        let role_type = segments.next().filter(|s| !s.is_empty())?.to_string();
        let path = segments.filter(|s| !s.is_empty()).map(str::to_string).collect();
        Some(Self { role_type, path })
    }

    /// Event id the role names, if any.
    #[must_use]
    pub fn event_ref(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// Subevent key (`"1.2"`, or `"0"` for an empty path).
    #[must_use]
    pub fn subevent_key(&self) -> String {
        if self.path.is_empty() {
            "0".to_string()
        } else {
            self.path.join(".")
        }
    }
}

/// A raw span with its kind and role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSpan {
    /// Tool id.
    pub id: String,
    /// Character offset (start, inclusive).
    pub begin: usize,
    /// Character offset (end, exclusive).
    pub end: usize,
    /// Kind and kind-specific label fields.
    pub kind: SpanKind,
    /// Role marker, if the span fills an event role.
    pub role: Option<RoleMarker>,
    /// Position in the input, for stable ordering.
    pub order: usize,
}

/// Classify one span against the schema.
pub fn classify(
    span: &RawSpan,
    order: usize,
    schema: &CompiledSchema,
    diags: &mut Diagnostics,
) -> ClassifiedSpan {
    let role = span.role_str().and_then(|r| {
        let parsed = RoleMarker::parse(r);
        if parsed.is_none() {
            diags.malformed(Some(&span.id), format!("unparseable role {:?}", r));
        }
        parsed
    });

    let kind = match span.label_str() {
        Some(label) => classify_label(&label.to_lowercase(), schema),
        None if role.is_some() => SpanKind::FreeText,
        None => {
            diags.malformed(Some(&span.id), "span has neither label nor role");
            SpanKind::Unlabeled
        }
    };
    if kind == SpanKind::Unrecognized {
        diags.malformed(
            Some(&span.id),
            format!("unrecognized label {:?}, span dropped", span.label_str().unwrap_or("")),
        );
    }

    ClassifiedSpan {
        id: span.id.clone(),
        begin: span.begin,
        end: span.end,
        kind,
        role,
        order,
    }
}

/// Kind of a lower-cased label.
#[must_use]
pub fn classify_label(label: &str, schema: &CompiledSchema) -> SpanKind {
    let segments: Vec<&str> = label.split('.').map(str::trim).collect();
    let first = segments[0];
    let second = segments.get(1).filter(|s| !s.is_empty()).map(|s| (*s).to_string());
    let rest = || -> Vec<String> {
        segments
            .iter()
            .skip(2)
            .filter(|s| !s.is_empty())
            .map(|s| (*s).to_string())
            .collect()
    };

    if schema.mention_types.contains(first) {
        SpanKind::Entity {
            mention_type: first.to_string(),
            entity_type: second,
            modifiers: rest(),
        }
    } else if first == schema.list_tag {
        SpanKind::List { subtype: second }
    } else if first == schema.attribute_tag {
        SpanKind::Attribute {
            subtype: second,
            modifiers: rest(),
        }
    } else if first == schema.descriptor_tag {
        SpanKind::Descriptor { desc_type: second }
    } else if first == schema.head_tag {
        SpanKind::Head
    } else if schema.value_tags.contains(first) {
        SpanKind::Value {
            value_type: second.unwrap_or_else(|| first.to_string()),
        }
    } else if schema.ignorable_tags.contains(first) {
        SpanKind::Ignored
    } else if let Some(number) = event_number(first, &schema.event_span_prefix) {
        SpanKind::EventSpan(EventLabel {
            number,
            event_type: second,
            modifiers: rest(),
        })
    } else if let Some(number) = event_number(first, &schema.trigger_prefix) {
        SpanKind::Trigger(EventLabel {
            number,
            event_type: second,
            modifiers: rest(),
        })
    } else {
        SpanKind::Unrecognized
    }
}

/// `Some(number)` if `segment` is `prefix` followed by optional digits.
fn event_number(segment: &str, prefix: &str) -> Option<Option<u32>> {
    let digits = segment.strip_prefix(prefix)?;
    if digits.is_empty() {
        return Some(None);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::default_schema;

    fn kind(label: &str) -> SpanKind {
        classify_label(label, default_schema())
    }

    #[test]
    fn test_entity_segments() {
        assert_eq!(
            kind("nam.per.plural.spec"),
            SpanKind::Entity {
                mention_type: "nam".into(),
                entity_type: Some("per".into()),
                modifiers: vec!["plural".into(), "spec".into()],
            }
        );
        assert_eq!(
            kind("pro"),
            SpanKind::Entity {
                mention_type: "pro".into(),
                entity_type: None,
                modifiers: vec![],
            }
        );
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(kind("lst"), SpanKind::List { subtype: None });
        assert!(matches!(kind("att.alias"), SpanKind::Attribute { .. }));
        assert!(matches!(kind("desc.occupation"), SpanKind::Descriptor { .. }));
        assert_eq!(kind("head"), SpanKind::Head);
        assert_eq!(kind("val"), SpanKind::Value { value_type: "val".into() });
        assert_eq!(kind("htr.delete"), SpanKind::Ignored);
        assert_eq!(kind("zzz.per"), SpanKind::Unrecognized);
    }

    #[test]
    fn test_event_prefixes() {
        let SpanKind::Trigger(label) = kind("ev12.sale") else {
            panic!("expected trigger");
        };
        assert_eq!(label.number, Some(12));
        assert_eq!(label.event_type.as_deref(), Some("sale"));

        let SpanKind::EventSpan(label) = kind("evs.trial") else {
            panic!("expected event span");
        };
        assert_eq!(label.number, None);

        assert_eq!(kind("evx.sale"), SpanKind::Unrecognized);
    }

    #[test]
    fn test_role_marker_parsing() {
        let role = RoleMarker::parse("Buyer.1.2").unwrap();
        assert_eq!(role.role_type, "buyer");
        assert_eq!(role.path, vec!["1", "2"]);
        assert_eq!(role.event_ref(), Some("1"));
        assert_eq!(role.subevent_key(), "1.2");
        assert_eq!(RoleMarker::parse("price").unwrap().subevent_key(), "0");
        assert!(RoleMarker::parse(".1").is_none());
    }

    #[test]
    fn test_missing_label_with_role_is_freetext() {
        let mut diags = Diagnostics::new();
        let span = RawSpan::free_text("f", 0, 3, "price.1");
        let classified = classify(&span, 0, default_schema(), &mut diags);
        assert_eq!(classified.kind, SpanKind::FreeText);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_missing_label_without_role_is_reported() {
        let mut diags = Diagnostics::new();
        let span = RawSpan {
            id: "u".into(),
            begin: 0,
            end: 1,
            label: None,
            role: None,
        };
        let classified = classify(&span, 0, default_schema(), &mut diags);
        assert_eq!(classified.kind, SpanKind::Unlabeled);
        assert_eq!(diags.as_slice().len(), 1);
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let mut diags = Diagnostics::new();
        let span = RawSpan::new("s", 0, 4, "NAM.PER");
        let classified = classify(&span, 0, default_schema(), &mut diags);
        assert!(matches!(
            classified.kind,
            SpanKind::Entity { ref entity_type, .. } if entity_type.as_deref() == Some("per")
        ));
    }
}
