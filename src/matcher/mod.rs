//! One matcher over three back-ends.
//!
//! Rules without a pattern are matched as phrases, list patterns go to the
//! token-attribute engine and string patterns to the regex engine. Each
//! back-end reports `(rule, range)` pairs; [`UnifiedMatcher`] concatenates
//! them (token patterns, then phrases, then regexes), applies per-rule
//! `on_match` filters and optionally prunes overlaps, keeping the longest.

mod phrase;
mod regex_matcher;
mod token;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use self::phrase::PhraseMatcher;
pub use self::regex_matcher::{token_for_offset, RegexMatcher, Resolve};
pub use self::token::TokenMatcher;
use crate::{ConfigResult, Document, Rule, RuleId, RulePattern, TokenRange};

/// A raw match produced by one of the back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub rule: RuleId,
    pub range: TokenRange,
}

impl Match {
    pub fn new(rule: RuleId, start: usize, end: usize) -> Self {
        Match {
            rule,
            range: TokenRange::new(start, end),
        }
    }
}

/// Common contract of the match back-ends.
pub trait MatchEngine {
    /// Every match that lies entirely inside `within`.
    fn find(&self, doc: &Document, within: TokenRange) -> Vec<Match>;
}

/// Which token string phrase rules are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchAttr {
    #[default]
    #[serde(rename = "LOWER", alias = "lower")]
    Lower,
    #[serde(rename = "TEXT", alias = "text")]
    Text,
}

/// Phrase, token-pattern and regex matching behind one call.
pub struct UnifiedMatcher<R> {
    rules: Vec<R>,
    phrases: PhraseMatcher,
    tokens: TokenMatcher,
    regexes: RegexMatcher,
    prune: bool,
}

impl<R: std::fmt::Debug> std::fmt::Debug for UnifiedMatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedMatcher")
            .field("rules", &self.rules)
            .field("prune", &self.prune)
            .finish()
    }
}

impl<R: Rule> UnifiedMatcher<R> {
    /// A pruning matcher comparing phrases on `attr`.
    pub fn new(attr: MatchAttr) -> Self {
        UnifiedMatcher {
            rules: Vec::new(),
            phrases: PhraseMatcher::new(attr),
            tokens: TokenMatcher::new(),
            regexes: RegexMatcher::new(),
            prune: true,
        }
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Change how regex offsets that fall inside tokens are snapped.
    pub fn with_regex_resolution(mut self, start: Resolve, end: Resolve) -> Self {
        self.regexes = self.regexes.with_resolution(start, end);
        self
    }

    /// Register rules. Either every rule is added or none is.
    pub fn add<I: IntoIterator<Item = R>>(&mut self, rules: I) -> ConfigResult<()> {
        let rules: Vec<R> = rules.into_iter().collect();
        let mut phrases = self.phrases.clone();
        let mut tokens = self.tokens.clone();
        let mut regexes = self.regexes.clone();

        for (offset, rule) in rules.iter().enumerate() {
            let id = RuleId(self.rules.len() + offset);
            match rule.pattern() {
                None => phrases.add(id, rule.literal())?,
                Some(RulePattern::Tokens(pattern)) => tokens.add(id, pattern, rule.literal())?,
                Some(RulePattern::Regex(pattern)) => {
                    tracing::warn!(
                        literal = rule.literal(),
                        pattern = pattern.as_str(),
                        "rule uses a regex pattern; matches are snapped to token boundaries and may not align with them"
                    );
                    regexes.add(id, pattern, rule.literal())?
                }
            }
        }

        self.phrases = phrases;
        self.tokens = tokens;
        self.regexes = regexes;
        self.rules.extend(rules);
        Ok(())
    }

    pub fn rules(&self) -> &[R] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&R> {
        self.rules.get(id.0)
    }

    /// Distinct categories of the registered rules.
    pub fn categories(&self) -> BTreeSet<String> {
        self.rules.iter().map(|r| r.category().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match the whole document.
    pub fn find(&self, doc: &Document) -> Vec<Match> {
        self.find_in(doc, doc.full_range())
    }

    /// Match inside one token range, such as a sentence.
    pub fn find_in(&self, doc: &Document, within: TokenRange) -> Vec<Match> {
        let mut matches = self.tokens.find(doc, within);
        matches.extend(self.phrases.find(doc, within));
        matches.extend(self.regexes.find(doc, within));

        matches.retain(|m| match self.rule(m.rule).and_then(|r| r.on_match()) {
            Some(filter) => filter(doc, m.range),
            None => true,
        });

        if self.prune {
            matches = prune_overlapping_matches(matches);
        }
        tracing::debug!(matches = matches.len(), within = %within, "matched rules");
        matches
    }
}

/// Resolve overlapping matches by keeping the longer one.
///
/// Matches are sorted by `(start, end)` and walked pairwise; of two
/// overlapping neighbors the longer survives (the earlier one on equal
/// length). Passes repeat until a pass removes nothing.
pub fn prune_overlapping_matches(matches: Vec<Match>) -> Vec<Match> {
    let mut current = matches;
    loop {
        let count = current.len();
        current.sort_by_key(|m| (m.range.start, m.range.end));

        let mut queue = current.into_iter();
        let Some(mut curr) = queue.next() else {
            return Vec::new();
        };
        let mut pruned = Vec::with_capacity(count);
        loop {
            let Some(next) = queue.next() else {
                pruned.push(curr);
                break;
            };
            if matches_overlap(&curr, &next) {
                let longer = if next.range.len() > curr.range.len() {
                    next
                } else {
                    curr
                };
                pruned.push(longer);
                match queue.next() {
                    Some(m) => curr = m,
                    None => break,
                }
            } else {
                pruned.push(curr);
                curr = next;
            }
        }

        if pruned.len() == count {
            return pruned;
        }
        current = pruned;
    }
}

fn matches_overlap(a: &Match, b: &Match) -> bool {
    starts_or_ends_inside(a, b) || starts_or_ends_inside(b, a)
}

fn starts_or_ends_inside(a: &Match, b: &Match) -> bool {
    let (a, b) = (a.range, b.range);
    (a.start >= b.start && a.start < b.end) || (a.end > b.start && a.end <= b.end)
}
