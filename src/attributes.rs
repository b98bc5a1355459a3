//! Span-level assertion attributes and category → attribute tables.
//!
//! Both the modifier graph and the sectionizer project their results onto
//! targets through an [`AttributeMapping`]: each category maps to a set of
//! boolean attribute assignments. Assignments only ever turn attributes on,
//! so applying several categories to one target is a logical OR.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The attribute names registered by default on every target.
pub const ASSERTION_ATTRIBUTES: [&str; 5] = [
    "is_negated",
    "is_uncertain",
    "is_historical",
    "is_hypothetical",
    "is_family",
];

/// Default modifier category → attribute table.
pub static DEFAULT_CONTEXT_ATTRIBUTES: Lazy<AttributeMapping> = Lazy::new(|| {
    AttributeMapping::new()
        .with("NEGATED_EXISTENCE", "is_negated", true)
        .with("POSSIBLE_EXISTENCE", "is_uncertain", true)
        .with("HISTORICAL", "is_historical", true)
        .with("HYPOTHETICAL", "is_hypothetical", true)
        .with("FAMILY", "is_family", true)
});

/// Boolean attributes accumulated on one target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanAttributes {
    values: BTreeMap<String, bool>,
}

impl SpanAttributes {
    /// Attributes with every name in [`ASSERTION_ATTRIBUTES`] set to false.
    pub fn with_defaults() -> Self {
        let values = ASSERTION_ATTRIBUTES
            .iter()
            .map(|name| (name.to_string(), false))
            .collect();
        Self { values }
    }

    /// Value of an attribute; unset attributes read as false.
    pub fn get(&self, name: &str) -> bool {
        self.values.get(name).copied().unwrap_or(false)
    }

    /// Is the attribute registered at all?
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Apply an assignment. A `true` can never be turned back off.
    pub fn assign(&mut self, name: &str, value: bool) {
        let entry = self.values.entry(name.to_string()).or_insert(false);
        *entry |= value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Names of the attributes currently true.
    pub fn active(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// OR another attribute set into this one.
    pub fn merge(&mut self, other: &SpanAttributes) {
        for (name, value) in other.iter() {
            self.assign(name, value);
        }
    }

    pub fn is_negated(&self) -> bool {
        self.get("is_negated")
    }

    pub fn is_uncertain(&self) -> bool {
        self.get("is_uncertain")
    }

    pub fn is_historical(&self) -> bool {
        self.get("is_historical")
    }

    pub fn is_hypothetical(&self) -> bool {
        self.get("is_hypothetical")
    }

    pub fn is_family(&self) -> bool {
        self.get("is_family")
    }
}

/// Category → attribute assignments table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMapping {
    table: BTreeMap<String, BTreeMap<String, bool>>,
}

impl AttributeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one assignment for a category.
    pub fn with(mut self, category: &str, attribute: &str, value: bool) -> Self {
        self.insert(category, attribute, value);
        self
    }

    pub fn insert(&mut self, category: &str, attribute: &str, value: bool) {
        self.table
            .entry(category.to_string())
            .or_default()
            .insert(attribute.to_string(), value);
    }

    pub fn get(&self, category: &str) -> Option<&BTreeMap<String, bool>> {
        self.table.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Every attribute name any category can assign.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .table
            .values()
            .flat_map(|assignments| assignments.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Apply the assignments of `category` to `attrs`.
    ///
    /// Returns false when the category has no entry.
    pub fn apply(&self, category: &str, attrs: &mut SpanAttributes) -> bool {
        match self.table.get(category) {
            Some(assignments) => {
                for (name, value) in assignments {
                    attrs.assign(name, *value);
                }
                true
            }
            None => false,
        }
    }

    /// Fresh attribute set with defaults plus every name this table assigns.
    pub fn empty_attributes(&self) -> SpanAttributes {
        let mut attrs = SpanAttributes::with_defaults();
        for name in self.attribute_names() {
            attrs.assign(name, false);
        }
        attrs
    }
}
