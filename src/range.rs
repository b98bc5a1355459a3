//! Half-open token ranges.
//!
//! Every span the core deals with (targets, modifier matches, scopes,
//! sections, sentences) is a [`TokenRange`] over a document's token sequence.
//! No text is copied; callers resolve text through [`crate::Document`].

use serde::{Deserialize, Serialize};

/// A half-open interval `[start, end)` of token indices.
///
/// Ordering is lexicographic on `(start, end)`, which is the order used when
/// deciding whether one match comes "after" another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted token range {}..{}", start, end);
        Self { start, end }
    }

    /// An empty range positioned at `at`.
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Does the range cover token `idx`?
    pub fn contains(&self, idx: usize) -> bool {
        self.start <= idx && idx < self.end
    }

    /// Is `other` entirely inside this range?
    pub fn contains_range(&self, other: &TokenRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// First token of the range, if any.
    pub fn first(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.start)
        }
    }

    /// Last token of the range, if any.
    pub fn last(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - 1)
        }
    }

    /// True when the two ranges share at least one token.
    pub fn overlaps(&self, other: &TokenRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Tokens shared by both ranges, or `None` when they are disjoint.
    pub fn intersection(&self, other: &TokenRange) -> Option<TokenRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(TokenRange { start, end })
        } else {
            None
        }
    }

    /// The gap between two ranges, empty when they touch or overlap.
    pub fn between(&self, other: &TokenRange) -> TokenRange {
        let start = self.end.min(other.end);
        let end = self.start.max(other.start);
        if start <= end {
            TokenRange { start, end }
        } else {
            TokenRange::empty(start.min(end))
        }
    }

    /// Smallest token distance between the edges of two ranges.
    ///
    /// Measured as `min(|self.start - other.end|, |other.start - self.end|)`.
    pub fn edge_distance(&self, other: &TokenRange) -> usize {
        let a = abs_diff(self.start, other.end);
        let b = abs_diff(other.start, self.end);
        a.min(b)
    }

    pub fn as_std(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

fn abs_diff(a: usize, b: usize) -> usize {
    if a > b {
        a - b
    } else {
        b - a
    }
}

impl From<std::ops::Range<usize>> for TokenRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        TokenRange::new(range.start, range.end)
    }
}

impl std::fmt::Display for TokenRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
