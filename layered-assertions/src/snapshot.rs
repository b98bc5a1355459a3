//! Serializable views of a resolved graph, for fixtures and caching.
//!
//! A snapshot copies the text of every span so it can be read without the
//! document. It is never read back into a live [`ModifierGraph`].

use layered_context::{Document, Target, TokenRange};
use serde::{Deserialize, Serialize};

use crate::{Direction, Modifier, ModifierGraph};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub label: String,
    pub range: TokenRange,
    pub text: String,
}

impl TargetSnapshot {
    pub fn new(target: &Target, doc: &Document) -> Self {
        Self {
            label: target.label.clone(),
            range: target.range,
            text: doc.text_of(target.range).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierSnapshot {
    pub literal: String,
    pub category: String,
    pub direction: Direction,
    pub range: TokenRange,
    pub text: String,
    pub scope: TokenRange,
    /// Indices into [`GraphSnapshot::targets`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<usize>,
}

impl ModifierSnapshot {
    pub fn new(modifier: &Modifier, doc: &Document) -> Self {
        Self {
            literal: modifier.rule().literal().to_string(),
            category: modifier.category().to_string(),
            direction: modifier.direction(),
            range: modifier.range(),
            text: doc.text_of(modifier.range()).to_string(),
            scope: modifier.scope(),
            targets: modifier.targets().iter().map(|id| id.0).collect(),
        }
    }
}

/// Everything a resolved graph knows about one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    pub targets: Vec<TargetSnapshot>,
    pub modifiers: Vec<ModifierSnapshot>,
    /// `(target, modifier)` index pairs in edge order
    pub edges: Vec<(usize, usize)>,
}

impl GraphSnapshot {
    pub fn new(graph: &ModifierGraph, doc: &Document) -> Self {
        Self {
            version: 1,
            targets: graph
                .targets()
                .iter()
                .map(|t| TargetSnapshot::new(t, doc))
                .collect(),
            modifiers: graph
                .modifiers()
                .iter()
                .map(|m| ModifierSnapshot::new(m, doc))
                .collect(),
            edges: graph
                .edges()
                .iter()
                .map(|e| (e.target.0, e.modifier.0))
                .collect(),
        }
    }

    /// Serialize to a pretty-printed RON string.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(false)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config)
    }

    pub fn from_ron_string(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Edges pointing at one target, as `(modifier literal, category)`.
    pub fn modifiers_of(&self, target: usize) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .filter(|(t, _)| *t == target)
            .filter_map(|(_, m)| self.modifiers.get(*m))
            .map(|m| (m.literal.as_str(), m.category.as_str()))
            .collect()
    }
}
