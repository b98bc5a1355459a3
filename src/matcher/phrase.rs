use crate::{ConfigError, ConfigResult, Document, RuleId, Token, TokenRange};

use super::{Match, MatchAttr, MatchEngine};

/// Exact token-sequence matching of rule literals.
///
/// Literals are tokenized with the same word-boundary rules as
/// [`Document::from_text`], then compared token by token on the configured
/// attribute.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    attr: MatchAttr,
    phrases: Vec<(RuleId, Vec<String>)>,
}

impl PhraseMatcher {
    pub fn new(attr: MatchAttr) -> Self {
        PhraseMatcher {
            attr,
            phrases: Vec::new(),
        }
    }

    pub fn attr(&self) -> MatchAttr {
        self.attr
    }

    pub fn add(&mut self, rule: RuleId, literal: &str) -> ConfigResult<()> {
        let parsed = Document::from_text(literal);
        let words: Vec<String> = parsed
            .tokens()
            .iter()
            .map(|t| self.key(t).to_string())
            .collect();
        if words.is_empty() {
            return Err(ConfigError::Validation(format!(
                "phrase rule '{}' has no tokens to match",
                literal
            )));
        }
        self.phrases.push((rule, words));
        Ok(())
    }

    fn key<'t>(&self, token: &'t Token) -> &'t str {
        match self.attr {
            MatchAttr::Lower => token.lower(),
            MatchAttr::Text => token.text(),
        }
    }
}

impl MatchEngine for PhraseMatcher {
    fn find(&self, doc: &Document, within: TokenRange) -> Vec<Match> {
        let tokens = doc.tokens();
        let end = within.end.min(tokens.len());
        let mut found = Vec::new();
        for start in within.start..end {
            for (rule, words) in &self.phrases {
                let stop = start + words.len();
                if stop > end {
                    continue;
                }
                let hit = tokens[start..stop]
                    .iter()
                    .zip(words)
                    .all(|(token, word)| self.key(token) == word);
                if hit {
                    found.push(Match::new(*rule, start, stop));
                }
            }
        }
        found
    }
}
