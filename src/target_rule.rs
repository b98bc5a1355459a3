//! Rule-based target extraction.
//!
//! A [`TargetRule`] names a concept by literal or pattern and a category;
//! the [`TargetMatcher`] runs a set of them and produces [`Target`]s ready
//! for the context and section components.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{read_config_file, write_config_file};
use crate::{
    ConfigResult, Document, MatchAttr, OnMatch, Rule, RuleId, RulePattern, SpanAttributes, Target,
    UnifiedMatcher,
};

/// A rule for extracting target concepts.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetRule {
    pub literal: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<RulePattern>,
    /// Attributes preset on every span this rule produces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip)]
    on_match: Option<OnMatch>,
}

impl std::fmt::Debug for TargetRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetRule")
            .field("literal", &self.literal)
            .field("category", &self.category)
            .field("pattern", &self.pattern)
            .field("attributes", &self.attributes)
            .field("on_match", &self.on_match.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetRuleFile {
    target_rules: Vec<TargetRule>,
}

#[derive(Serialize)]
struct TargetRuleFileRef<'a> {
    target_rules: &'a [TargetRule],
}

impl TargetRule {
    pub fn new(literal: impl Into<String>, category: impl Into<String>) -> Self {
        TargetRule {
            literal: literal.into(),
            category: category.into(),
            pattern: None,
            attributes: None,
            metadata: None,
            on_match: None,
        }
    }

    pub fn with_pattern(mut self, pattern: RulePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: bool) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), value);
        self
    }

    pub fn with_on_match(mut self, on_match: OnMatch) -> Self {
        self.on_match = Some(on_match);
        self
    }

    /// Parse `{"target_rules": [...]}`.
    pub fn from_json_str(json: &str) -> ConfigResult<Vec<TargetRule>> {
        let file: TargetRuleFile = serde_json::from_str(json)?;
        Ok(file.target_rules)
    }

    pub fn from_json_file(path: &Path) -> ConfigResult<Vec<TargetRule>> {
        Self::from_json_str(&read_config_file(path)?)
    }

    pub fn to_json(rules: &[TargetRule]) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(&TargetRuleFileRef { target_rules: rules })?)
    }

    pub fn to_json_file(rules: &[TargetRule], path: &Path) -> ConfigResult<()> {
        write_config_file(path, &Self::to_json(rules)?)
    }
}

impl Rule for TargetRule {
    fn literal(&self) -> &str {
        &self.literal
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn pattern(&self) -> Option<&RulePattern> {
        self.pattern.as_ref()
    }

    fn on_match(&self) -> Option<&OnMatch> {
        self.on_match.as_ref()
    }
}

/// A target produced by a [`TargetRule`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedTarget {
    pub target: Target,
    pub rule: RuleId,
    pub attributes: SpanAttributes,
}

/// Extracts targets from documents with a set of [`TargetRule`]s.
#[derive(Debug)]
pub struct TargetMatcher {
    matcher: UnifiedMatcher<TargetRule>,
}

impl TargetMatcher {
    pub fn new(attr: MatchAttr) -> Self {
        TargetMatcher {
            matcher: UnifiedMatcher::new(attr),
        }
    }

    pub fn add<I: IntoIterator<Item = TargetRule>>(&mut self, rules: I) -> ConfigResult<()> {
        self.matcher.add(rules)
    }

    pub fn rules(&self) -> &[TargetRule] {
        self.matcher.rules()
    }

    pub fn categories(&self) -> Vec<String> {
        self.matcher.categories().into_iter().collect()
    }

    /// All targets found in the document, in match order.
    pub fn find(&self, doc: &Document) -> Vec<MatchedTarget> {
        self.matcher
            .find(doc)
            .into_iter()
            .filter_map(|m| {
                let rule = self.matcher.rule(m.rule)?;
                let mut attributes = SpanAttributes::with_defaults();
                for (name, value) in rule.attributes.iter().flatten() {
                    attributes.assign(name, *value);
                }
                Some(MatchedTarget {
                    target: Target {
                        range: m.range,
                        label: rule.category.clone(),
                    },
                    rule: m.rule,
                    attributes,
                })
            })
            .collect()
    }

    /// Add found targets to an existing entity list.
    ///
    /// Entities already present win: a found target overlapping any of them
    /// is skipped. The list is kept sorted by range. Returns the targets that
    /// were added.
    pub fn add_entities(&self, doc: &Document, entities: &mut Vec<Target>) -> Vec<MatchedTarget> {
        let mut added = Vec::new();
        for found in self.find(doc) {
            if entities.iter().any(|e| e.range.overlaps(&found.target.range)) {
                continue;
            }
            entities.push(found.target.clone());
            added.push(found);
        }
        entities.sort_by_key(|e| e.range);
        added
    }
}
