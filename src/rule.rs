//! The rule interface shared by target, modifier and section rules.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Document, TokenPattern, TokenRange};

/// Index of a rule inside the matcher that registered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub usize);

/// How a rule finds text, when not by its literal.
///
/// In rule files a JSON list is a token pattern and a JSON string is a
/// regular expression over the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RulePattern {
    Tokens(TokenPattern),
    Regex(String),
}

/// Match filter called with every raw match of a rule.
///
/// Returning false drops the match.
pub type OnMatch = Arc<dyn Fn(&Document, TokenRange) -> bool + Send + Sync>;

/// Anything the unified matcher can register.
pub trait Rule {
    /// The phrase matched when no pattern is given.
    fn literal(&self) -> &str;

    /// Semantic class attached to every match of the rule.
    fn category(&self) -> &str;

    fn pattern(&self) -> Option<&RulePattern>;

    fn on_match(&self) -> Option<&OnMatch> {
        None
    }
}

impl<R: Rule + ?Sized> Rule for Arc<R> {
    fn literal(&self) -> &str {
        (**self).literal()
    }

    fn category(&self) -> &str {
        (**self).category()
    }

    fn pattern(&self) -> Option<&RulePattern> {
        (**self).pattern()
    }

    fn on_match(&self) -> Option<&OnMatch> {
        (**self).on_match()
    }
}

/// Normalize a set-like list of category names to upper case.
pub fn upper_set<I, S>(values: I) -> std::collections::BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().to_uppercase())
        .collect()
}
