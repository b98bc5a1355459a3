use crate::pattern::CompiledPattern;
use crate::{ConfigResult, Document, RuleId, TokenRange, TokenSpec};

use super::{Match, MatchEngine};

/// Token-attribute pattern matching.
#[derive(Debug, Clone, Default)]
pub struct TokenMatcher {
    patterns: Vec<(RuleId, CompiledPattern)>,
}

impl TokenMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: RuleId, pattern: &[TokenSpec], literal: &str) -> ConfigResult<()> {
        let compiled = CompiledPattern::compile(pattern, literal)?;
        self.patterns.push((rule, compiled));
        Ok(())
    }
}

impl MatchEngine for TokenMatcher {
    fn find(&self, doc: &Document, within: TokenRange) -> Vec<Match> {
        let mut found: Vec<Match> = self
            .patterns
            .iter()
            .flat_map(|(rule, pattern)| {
                pattern
                    .find_all(doc.tokens(), within)
                    .into_iter()
                    .map(move |range| Match { rule: *rule, range })
            })
            .collect();
        found.sort_by_key(|m| (m.range.start, m.range.end));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_sorted_by_position() {
        let mut matcher = TokenMatcher::new();
        matcher
            .add(RuleId(0), &[TokenSpec::lower("fever")], "fever")
            .unwrap();
        matcher
            .add(RuleId(1), &[TokenSpec::lower("no")], "no")
            .unwrap();
        let doc = Document::from_text("no fever");
        assert_eq!(
            matcher.find(&doc, doc.full_range()),
            vec![Match::new(RuleId(1), 0, 1), Match::new(RuleId(0), 1, 2)]
        );
    }
}
