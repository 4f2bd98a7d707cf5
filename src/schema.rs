//! Annotation-scheme vocabulary and entity-type normalization.
//!
//! # The Vocabulary Problem
//!
//! Span labels are dotted strings whose segments only mean something against
//! a tag vocabulary:
//!
//! ```text
//! ┌────────────────────┬──────────────────────────────────────────────┐
//! │ Label              │ Reading                                      │
//! ├────────────────────┼──────────────────────────────────────────────┤
//! │ nam.per.plural     │ name mention, person, number = plural        │
//! │ att.alias          │ attribute, subtype alias                     │
//! │ desc.occupation    │ descriptor of type occupation                │
//! │ ev1.sale           │ trigger of event #1, type sale               │
//! │ htr.delete         │ layout repair instruction (not an entity)    │
//! └────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! The vocabulary changes between annotation campaigns, so it is data: a
//! [`Schema`] loaded once (JSON) and compiled into a read-only
//! [`CompiledSchema`] shared by every document.
//!
//! # Usage
//!
//! ```rust
//! use standoff_tree::schema::{ModifierCategory, Schema};
//!
//! let schema = Schema::from_json_str(r#"{
//!     "normalization": [{"pattern": "^person$", "replacement": "per"}]
//! }"#).unwrap().compile().unwrap();
//!
//! assert_eq!(schema.normalize_entity_type("person"), "per");
//! assert_eq!(schema.modifier_category("plural"), Some(ModifierCategory::Number));
//! ```

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// =============================================================================
// Raw Schema (serde)
// =============================================================================

/// One ordered entity-type substitution rule (`regex` syntax; `$1` etc. in
/// the replacement refer to capture groups).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationRule {
    /// Pattern matched against the lower-cased entity type.
    pub pattern: String,
    /// Replacement text.
    pub replacement: String,
}

impl NormalizationRule {
    /// Create a rule.
    #[must_use]
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Tag vocabulary of the annotation scheme.
///
/// Every field has a default, so a schema file only needs to list what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Mention-type tags that open an entity label (`nam`, `nom`, ...).
    pub mention_types: BTreeSet<String>,
    /// Mention type of proper names; forced on `alias` attributes.
    pub name_type: String,
    /// Mention type given to ordinary attributes.
    pub nominal_type: String,
    /// Mention type given to attributes carrying the pronoun marker.
    pub pronoun_type: String,
    /// First segment of list labels.
    pub list_tag: String,
    /// First segment of attribute labels.
    pub attribute_tag: String,
    /// First segment of descriptor labels.
    pub descriptor_tag: String,
    /// First segment of head labels.
    pub head_tag: String,
    /// First segments of value labels.
    pub value_tags: BTreeSet<String>,
    /// First segments of spans consumed before segmentation (`htr`).
    pub ignorable_tags: BTreeSet<String>,
    /// Prefix of event trigger labels (`ev`, `ev1`, ...).
    pub trigger_prefix: String,
    /// Prefix of explicit event span labels (`evs`, `evs2`, ...).
    pub event_span_prefix: String,
    /// Grammatical number modifiers.
    pub number_values: BTreeSet<String>,
    /// Specificity modifiers.
    pub specificity_values: BTreeSet<String>,
    /// Tense modifiers (entities, events and relations).
    pub tense_values: BTreeSet<String>,
    /// Modifiers accepted without being stored.
    pub other_values: BTreeSet<String>,
    /// Trailing entity-label segments that denote a relation to nested mentions.
    pub relation_markers: BTreeSet<String>,
    /// Relation labels that mean coreference.
    pub coreference_labels: BTreeSet<String>,
    /// Attribute subtype that turns the attribute into a name mention.
    pub alias_subtype: String,
    /// Attribute modifier that turns the attribute into a pronoun mention.
    pub pronoun_marker: String,
    /// Relation type linking an attribute to the mention it qualifies.
    pub attribute_parent_relation: String,
    /// Entity type used when none can be determined.
    pub unknown_entity_type: String,
    /// Ordered entity-type substitution rules.
    pub normalization: Vec<NormalizationRule>,
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            mention_types: set(&["nam", "nom", "pro", "unk"]),
            name_type: "nam".into(),
            nominal_type: "nom".into(),
            pronoun_type: "pro".into(),
            list_tag: "lst".into(),
            attribute_tag: "att".into(),
            descriptor_tag: "desc".into(),
            head_tag: "head".into(),
            value_tags: set(&["val"]),
            ignorable_tags: set(&["htr"]),
            trigger_prefix: "ev".into(),
            event_span_prefix: "evs".into(),
            number_values: set(&["sgl", "plural"]),
            specificity_values: set(&["spec", "unspec", "gen", "neg"]),
            tense_values: set(&["past", "pres", "fut"]),
            other_values: set(&["unc", "meta"]),
            relation_markers: set(&["rel"]),
            coreference_labels: set(&["coref"]),
            alias_subtype: "alias".into(),
            pronoun_marker: "pro".into(),
            attribute_parent_relation: "attribute_of".into(),
            unknown_entity_type: "unknown".into(),
            normalization: Vec::new(),
        }
    }
}

impl Schema {
    /// Parse a schema from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Read a schema JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate, lower-case and compile the normalization rules.
    pub fn compile(self) -> Result<CompiledSchema> {
        let schema = self.lowercased();
        for (name, value) in [
            ("trigger_prefix", &schema.trigger_prefix),
            ("event_span_prefix", &schema.event_span_prefix),
            ("list_tag", &schema.list_tag),
            ("attribute_tag", &schema.attribute_tag),
            ("descriptor_tag", &schema.descriptor_tag),
            ("head_tag", &schema.head_tag),
        ] {
            if value.is_empty() || value.contains('.') {
                return Err(Error::schema(format!(
                    "{} must be a non-empty tag without '.', got {:?}",
                    name, value
                )));
            }
        }

        let mut rules = Vec::with_capacity(schema.normalization.len());
        for rule in &schema.normalization {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                Error::schema(format!("invalid normalization pattern {:?}: {}", rule.pattern, e))
            })?;
            rules.push((regex, rule.replacement.clone()));
        }

        Ok(CompiledSchema { schema, rules })
    }

    fn lowercased(mut self) -> Self {
        fn lower_set(items: &BTreeSet<String>) -> BTreeSet<String> {
            items.iter().map(|s| s.to_lowercase()).collect()
        }
        self.mention_types = lower_set(&self.mention_types);
        self.value_tags = lower_set(&self.value_tags);
        self.ignorable_tags = lower_set(&self.ignorable_tags);
        self.number_values = lower_set(&self.number_values);
        self.specificity_values = lower_set(&self.specificity_values);
        self.tense_values = lower_set(&self.tense_values);
        self.other_values = lower_set(&self.other_values);
        self.relation_markers = lower_set(&self.relation_markers);
        self.coreference_labels = lower_set(&self.coreference_labels);
        for field in [
            &mut self.name_type,
            &mut self.nominal_type,
            &mut self.pronoun_type,
            &mut self.list_tag,
            &mut self.attribute_tag,
            &mut self.descriptor_tag,
            &mut self.head_tag,
            &mut self.trigger_prefix,
            &mut self.event_span_prefix,
            &mut self.alias_subtype,
            &mut self.pronoun_marker,
        ] {
            *field = field.to_lowercase();
        }
        self
    }
}

// =============================================================================
// Compiled Schema
// =============================================================================

/// Which vocabulary a label modifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierCategory {
    /// Grammatical number.
    Number,
    /// Specificity.
    Specificity,
    /// Tense.
    Tense,
    /// Relation marker on an entity label.
    RelationMarker,
    /// Known but not stored.
    Other,
}

/// A validated schema with compiled normalization rules. Read-only.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    schema: Schema,
    rules: Vec<(Regex, String)>,
}

impl Default for CompiledSchema {
    fn default() -> Self {
        // The built-in schema carries no normalization rules.
        Self {
            schema: Schema::default(),
            rules: Vec::new(),
        }
    }
}

/// The built-in schema, compiled once per process.
#[must_use]
pub fn default_schema() -> &'static CompiledSchema {
    static DEFAULT: Lazy<CompiledSchema> = Lazy::new(CompiledSchema::default);
    &DEFAULT
}

impl CompiledSchema {
    /// The underlying vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> &Schema {
        &self.schema
    }

    /// Apply the normalization rules, in order, to a raw entity type.
    #[must_use]
    pub fn normalize_entity_type(&self, raw: &str) -> String {
        let mut value = raw.to_lowercase();
        for (regex, replacement) in &self.rules {
            value = regex.replace_all(&value, replacement.as_str()).into_owned();
        }
        value
    }

    /// Vocabulary a modifier segment belongs to, if any.
    ///
    /// Checked in the order number, specificity, tense, relation marker,
    /// other; the first hit wins.
    #[must_use]
    pub fn modifier_category(&self, segment: &str) -> Option<ModifierCategory> {
        let s = &self.schema;
        if s.number_values.contains(segment) {
            Some(ModifierCategory::Number)
        } else if s.specificity_values.contains(segment) {
            Some(ModifierCategory::Specificity)
        } else if s.tense_values.contains(segment) {
            Some(ModifierCategory::Tense)
        } else if s.relation_markers.contains(segment) {
            Some(ModifierCategory::RelationMarker)
        } else if s.other_values.contains(segment) {
            Some(ModifierCategory::Other)
        } else {
            None
        }
    }

    /// Whether a relation label denotes coreference.
    #[must_use]
    pub fn is_coreference(&self, label: &str) -> bool {
        let first = label.split('.').next().unwrap_or("").to_lowercase();
        self.schema.coreference_labels.contains(&first)
    }
}

impl std::ops::Deref for CompiledSchema {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        &self.schema
    }
}
