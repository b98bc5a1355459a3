#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Shared building blocks for contextual assertion over clinical text.
//!
//! This crate holds everything the assertion and section plugins have in
//! common:
//!
//! - [`TokenRange`] - Half-open token intervals used for every span
//! - [`Document`] / [`Token`] - Tokenized input with optional sentences
//! - [`SentenceSplitter`] - Punctuation-driven sentence segmentation
//! - [`Target`] - Labeled concept spans to annotate
//! - [`Rule`] / [`UnifiedMatcher`] - Phrase, token-pattern and regex matching
//! - [`SpanAttributes`] / [`AttributeMapping`] - Boolean attribute projection
//! - [`TargetRule`] / [`TargetMatcher`] - Rule-based target extraction
//!
//! ## Example
//!
//! ```
//! use layered_context::{Document, MatchAttr, TargetMatcher, TargetRule};
//!
//! let doc = Document::from_text("No evidence of pneumonia.");
//! let mut matcher = TargetMatcher::new(MatchAttr::Lower);
//! matcher.add(vec![TargetRule::new("pneumonia", "PROBLEM")]).unwrap();
//!
//! let targets = matcher.find(&doc);
//! assert_eq!(doc.text_of(targets[0].target.range), "pneumonia");
//! ```

mod attributes;
mod document;
mod errors;
mod matcher;
mod pattern;
mod range;
mod rule;
mod sentence;
mod target;
mod target_rule;

pub use attributes::{AttributeMapping, SpanAttributes, ASSERTION_ATTRIBUTES, DEFAULT_CONTEXT_ATTRIBUTES};
pub use document::{Document, Token};
pub use errors::{read_config_file, write_config_file, ConfigError, ConfigResult};
pub use matcher::{
    prune_overlapping_matches, token_for_offset, Match, MatchAttr, MatchEngine, PhraseMatcher,
    RegexMatcher, Resolve, TokenMatcher, UnifiedMatcher,
};
pub use pattern::{CompiledPattern, Quantifier, StrPredicate, TokenPattern, TokenSpec};
pub use range::TokenRange;
pub use rule::{upper_set, OnMatch, Rule, RuleId, RulePattern};
pub use sentence::SentenceSplitter;
pub use target::{Target, TargetId};
pub use target_rule::{MatchedTarget, TargetMatcher, TargetRule};
