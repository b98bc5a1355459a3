//! Target spans: the clinical concepts that modifiers and sections annotate.
//!
//! Targets are produced outside the core (an entity recognizer, or the
//! [`crate::TargetMatcher`]); the core only reads their range and label.

use serde::{Deserialize, Serialize};

use crate::TokenRange;

/// Stable index of a target within one document's target list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub usize);

/// A labeled token range identified as a concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub range: TokenRange,
    /// Category of the concept, e.g. "PROBLEM"
    pub label: String,
}

impl Target {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            range: TokenRange::new(start, end),
            label: label.into(),
        }
    }

    /// Label normalized for type-filter comparisons.
    pub fn normalized_label(&self) -> String {
        self.label.to_uppercase()
    }
}
