use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult, Document, RuleId, TokenRange};

use super::{Match, MatchEngine};

/// Direction to snap a character offset that falls inside a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolve {
    /// Snap outward to the start of the enclosing token
    Left,
    /// Snap to the next token boundary
    Right,
}

/// Case-insensitive regular expressions over the document text.
///
/// Match offsets that line up with token boundaries are used directly.
/// Otherwise the start offset is snapped with `resolve_start` and the end
/// offset with `resolve_end`; by default both expand outward. Matches that
/// snap to an empty range are dropped.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    patterns: Vec<(RuleId, Regex)>,
    resolve_start: Resolve,
    resolve_end: Resolve,
}

impl RegexMatcher {
    pub fn new() -> Self {
        RegexMatcher {
            patterns: Vec::new(),
            resolve_start: Resolve::Left,
            resolve_end: Resolve::Right,
        }
    }

    pub fn with_resolution(mut self, start: Resolve, end: Resolve) -> Self {
        self.resolve_start = start;
        self.resolve_end = end;
        self
    }

    pub fn add(&mut self, rule: RuleId, pattern: &str, literal: &str) -> ConfigResult<()> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                literal: literal.to_string(),
                source,
            })?;
        self.patterns.push((rule, re));
        Ok(())
    }

    fn resolve(&self, doc: &Document, start: usize, end: usize) -> TokenRange {
        if let Some(range) = doc.char_span(start, end) {
            return range;
        }
        let token_start = token_for_offset(doc, start, self.resolve_start).unwrap_or(doc.len());
        let token_end = token_for_offset(doc, end, self.resolve_end).unwrap_or(doc.len());
        if token_start < token_end {
            TokenRange::new(token_start, token_end)
        } else {
            TokenRange::empty(token_start)
        }
    }
}

impl Default for RegexMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchEngine for RegexMatcher {
    fn find(&self, doc: &Document, within: TokenRange) -> Vec<Match> {
        let Some((base, text)) = text_of_range(doc, within) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for (rule, re) in &self.patterns {
            for m in re.find_iter(text) {
                let range = self.resolve(doc, base + m.start(), base + m.end());
                if !range.is_empty() && within.contains_range(&range) {
                    found.push(Match { rule: *rule, range });
                }
            }
        }
        found
    }
}

/// Text covered by a token range including trailing whitespace, with its
/// byte offset in the document.
fn text_of_range(doc: &Document, within: TokenRange) -> Option<(usize, &str)> {
    if within.is_empty() || within.end > doc.len() {
        return None;
    }
    let first = doc.token(within.start)?;
    let last = doc.token(within.end - 1)?;
    let start = first.offset();
    let end = last.end_offset() + last.whitespace().len();
    doc.text().get(start..end).map(|text| (start, text))
}

/// The token a byte offset snaps to.
///
/// An offset at a token start is that token. An offset inside a token
/// resolves to the enclosing token (`Left`) or the following one (`Right`).
/// Past the last token start, `Left` gives the last token and `Right` gives
/// `None`, meaning the end of the document.
pub fn token_for_offset(doc: &Document, offset: usize, resolve: Resolve) -> Option<usize> {
    let tokens = doc.tokens();
    match tokens.iter().position(|t| t.offset() >= offset) {
        Some(i) if tokens[i].offset() == offset => Some(i),
        Some(i) => match resolve {
            Resolve::Left => Some(i.saturating_sub(1)),
            Resolve::Right => Some(i),
        },
        None => match resolve {
            Resolve::Left => tokens.len().checked_sub(1),
            Resolve::Right => None,
        },
    }
}
