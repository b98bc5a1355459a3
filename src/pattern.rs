//! Token-attribute patterns.
//!
//! A pattern is a list of per-token specs, each optionally repeated by an
//! `OP` quantifier:
//!
//! ```json
//! [{"LOWER": "no"}, {"LOWER": {"IN": ["evidence", "sign"]}, "OP": "?"}, {"IS_PUNCT": true, "OP": "!"}]
//! ```
//!
//! Patterns are compiled once when a rule is registered and matched against
//! every start position of a document. All distinct non-empty matches are
//! reported, so overlapping matches are left to the pruning step.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult, Token, TokenRange};

/// A token pattern as written in rule files.
pub type TokenPattern = Vec<TokenSpec>;

/// Constraints on a single token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSpec {
    #[serde(rename = "TEXT", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<StrPredicate>,
    /// Compared against the lowercased token. Exact and `IN` values are
    /// lowercased too, so `{"LOWER": "No"}` matches "no". `REGEX` values are
    /// used as written.
    #[serde(rename = "LOWER", default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<StrPredicate>,
    #[serde(rename = "IS_PUNCT", default, skip_serializing_if = "Option::is_none")]
    pub is_punct: Option<bool>,
    #[serde(rename = "IS_DIGIT", default, skip_serializing_if = "Option::is_none")]
    pub is_digit: Option<bool>,
    #[serde(rename = "IS_ALPHA", default, skip_serializing_if = "Option::is_none")]
    pub is_alpha: Option<bool>,
    #[serde(rename = "IS_UPPER", default, skip_serializing_if = "Option::is_none")]
    pub is_upper: Option<bool>,
    #[serde(rename = "IS_TITLE", default, skip_serializing_if = "Option::is_none")]
    pub is_title: Option<bool>,
    #[serde(rename = "OP", default, skip_serializing_if = "Option::is_none")]
    pub op: Option<Quantifier>,
}

impl TokenSpec {
    pub fn lower(value: &str) -> Self {
        TokenSpec {
            lower: Some(StrPredicate::Exact(value.to_string())),
            ..Default::default()
        }
    }

    pub fn text(value: &str) -> Self {
        TokenSpec {
            text: Some(StrPredicate::Exact(value.to_string())),
            ..Default::default()
        }
    }

    pub fn with_op(mut self, op: Quantifier) -> Self {
        self.op = Some(op);
        self
    }
}

/// String condition on `TEXT` or `LOWER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrPredicate {
    Exact(String),
    In {
        #[serde(rename = "IN")]
        values: Vec<String>,
    },
    Regex {
        #[serde(rename = "REGEX")]
        pattern: String,
    },
}

/// How many consecutive tokens a spec consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    /// Exactly one token that does NOT satisfy the spec
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "?")]
    Optional,
    #[serde(rename = "*")]
    ZeroOrMore,
    #[serde(rename = "+")]
    OneOrMore,
    #[serde(rename = "1")]
    One,
}

#[derive(Debug, Clone)]
enum CompiledStr {
    Exact(String),
    In(HashSet<String>),
    Regex(Regex),
}

impl CompiledStr {
    fn compile(predicate: &StrPredicate, lowercase: bool, literal: &str) -> ConfigResult<Self> {
        let norm = |s: &str| if lowercase { s.to_lowercase() } else { s.to_string() };
        Ok(match predicate {
            StrPredicate::Exact(value) => CompiledStr::Exact(norm(value)),
            StrPredicate::In { values } => CompiledStr::In(values.iter().map(|v| norm(v)).collect()),
            StrPredicate::Regex { pattern } => {
                CompiledStr::Regex(Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    literal: literal.to_string(),
                    source,
                })?)
            }
        })
    }

    fn test(&self, value: &str) -> bool {
        match self {
            CompiledStr::Exact(expected) => expected == value,
            CompiledStr::In(values) => values.contains(value),
            CompiledStr::Regex(re) => re.is_match(value),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledSpec {
    text: Option<CompiledStr>,
    lower: Option<CompiledStr>,
    flags: Vec<(fn(&Token) -> bool, bool)>,
    op: Quantifier,
}

impl CompiledSpec {
    fn test(&self, token: &Token) -> bool {
        if let Some(text) = &self.text {
            if !text.test(token.text()) {
                return false;
            }
        }
        if let Some(lower) = &self.lower {
            if !lower.test(token.lower()) {
                return false;
            }
        }
        self.flags.iter().all(|(flag, expected)| flag(token) == *expected)
    }

    /// Does the spec accept this token once, taking `!` into account.
    fn accepts(&self, token: &Token) -> bool {
        match self.op {
            Quantifier::Not => !self.test(token),
            _ => self.test(token),
        }
    }
}

/// A pattern ready to run over tokens.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    specs: Vec<CompiledSpec>,
}

impl CompiledPattern {
    /// Compile a pattern, reporting regex failures against `literal`.
    pub fn compile(pattern: &[TokenSpec], literal: &str) -> ConfigResult<Self> {
        if pattern.is_empty() {
            return Err(ConfigError::Validation(format!(
                "rule '{}' has an empty token pattern",
                literal
            )));
        }
        let specs = pattern
            .iter()
            .map(|spec| {
                let mut flags: Vec<(fn(&Token) -> bool, bool)> = Vec::new();
                let table: [(Option<bool>, fn(&Token) -> bool); 5] = [
                    (spec.is_punct, Token::is_punct),
                    (spec.is_digit, Token::is_digit),
                    (spec.is_alpha, Token::is_alpha),
                    (spec.is_upper, Token::is_upper),
                    (spec.is_title, Token::is_title),
                ];
                for (expected, flag) in table {
                    if let Some(expected) = expected {
                        flags.push((flag, expected));
                    }
                }
                Ok(CompiledSpec {
                    text: spec
                        .text
                        .as_ref()
                        .map(|p| CompiledStr::compile(p, false, literal))
                        .transpose()?,
                    lower: spec
                        .lower
                        .as_ref()
                        .map(|p| CompiledStr::compile(p, true, literal))
                        .transpose()?,
                    flags,
                    op: spec.op.unwrap_or(Quantifier::One),
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(CompiledPattern { specs })
    }

    /// Every distinct non-empty range the pattern matches inside `within`.
    pub fn find_all(&self, tokens: &[Token], within: TokenRange) -> Vec<TokenRange> {
        let limit = within.end.min(tokens.len());
        let tokens = &tokens[..limit];
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        for start in within.start..limit {
            let mut ends = BTreeSet::new();
            seen.clear();
            self.ends_from(tokens, 0, start, &mut ends, &mut seen);
            for end in ends {
                if end > start {
                    found.push(TokenRange::new(start, end));
                }
            }
        }
        found
    }

    /// Collect the ends reachable from spec `si` at token `ti` into `out`.
    ///
    /// `seen` holds the `(si, ti)` pairs already expanded for the current
    /// start; their ends are in `out` already.
    fn ends_from(
        &self,
        tokens: &[Token],
        si: usize,
        ti: usize,
        out: &mut BTreeSet<usize>,
        seen: &mut HashSet<(usize, usize)>,
    ) {
        if !seen.insert((si, ti)) {
            return;
        }
        let Some(spec) = self.specs.get(si) else {
            out.insert(ti);
            return;
        };
        let accepts_at = |t: usize| t < tokens.len() && spec.accepts(&tokens[t]);
        match spec.op {
            Quantifier::One | Quantifier::Not => {
                if accepts_at(ti) {
                    self.ends_from(tokens, si + 1, ti + 1, out, seen);
                }
            }
            Quantifier::Optional => {
                self.ends_from(tokens, si + 1, ti, out, seen);
                if accepts_at(ti) {
                    self.ends_from(tokens, si + 1, ti + 1, out, seen);
                }
            }
            Quantifier::ZeroOrMore => {
                let mut t = ti;
                loop {
                    self.ends_from(tokens, si + 1, t, out, seen);
                    if !accepts_at(t) {
                        break;
                    }
                    t += 1;
                }
            }
            Quantifier::OneOrMore => {
                let mut t = ti;
                while accepts_at(t) {
                    t += 1;
                    self.ends_from(tokens, si + 1, t, out, seen);
                }
            }
        }
    }
}
