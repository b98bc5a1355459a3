use std::path::Path;

use layered_context::{
    read_config_file, write_config_file, ConfigError, ConfigResult, OnMatch, Rule, RulePattern,
};
use serde::{Deserialize, Serialize};

/// A section header rule, e.g. "Past Medical History:" → `past_medical_history`.
///
/// Categories are kept as written; they are compared exactly when rules name
/// each other as parents.
#[derive(Clone)]
pub struct SectionRule {
    literal: String,
    category: String,
    pattern: Option<RulePattern>,
    parents: Vec<String>,
    parent_required: bool,
    max_scope: Option<usize>,
    metadata: Option<serde_json::Value>,
    on_match: Option<OnMatch>,
}

impl std::fmt::Debug for SectionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionRule")
            .field("literal", &self.literal)
            .field("category", &self.category)
            .field("pattern", &self.pattern)
            .field("parents", &self.parents)
            .field("parent_required", &self.parent_required)
            .field("max_scope", &self.max_scope)
            .finish()
    }
}

impl SectionRule {
    pub fn new(literal: impl Into<String>, category: impl Into<String>) -> Self {
        SectionRule {
            literal: literal.into(),
            category: category.into(),
            pattern: None,
            parents: Vec::new(),
            parent_required: false,
            max_scope: None,
            metadata: None,
            on_match: None,
        }
    }

    pub fn with_pattern(mut self, pattern: RulePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Categories this section may be nested under.
    ///
    /// Emptying the parents of a rule that requires one makes the rule
    /// invalid; [`crate::Sectionizer::add`] rejects it.
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Drop the section when none of its parents precede it.
    ///
    /// Fails when no parents were declared.
    pub fn with_parent_required(mut self) -> ConfigResult<Self> {
        if self.parents.is_empty() {
            return Err(ConfigError::ParentRequiredWithoutParents {
                category: self.category,
            });
        }
        self.parent_required = true;
        Ok(self)
    }

    /// Cap the body at `max_scope` tokens after the header.
    pub fn with_max_scope(mut self, max_scope: usize) -> ConfigResult<Self> {
        if max_scope == 0 {
            return Err(ConfigError::NonPositive {
                literal: self.literal,
                field: "max_scope",
            });
        }
        self.max_scope = Some(max_scope);
        Ok(self)
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_on_match(mut self, on_match: OnMatch) -> Self {
        self.on_match = Some(on_match);
        self
    }

    /// Check settings that can be broken by later builder calls.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.parent_required && self.parents.is_empty() {
            return Err(ConfigError::ParentRequiredWithoutParents {
                category: self.category.clone(),
            });
        }
        Ok(())
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn parent_required(&self) -> bool {
        self.parent_required
    }

    pub fn max_scope(&self) -> Option<usize> {
        self.max_scope
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn to_record(&self) -> SectionRuleRecord {
        SectionRuleRecord {
            literal: self.literal.clone(),
            category: self.category.clone(),
            pattern: self.pattern.clone(),
            metadata: self.metadata.clone(),
            parents: self.parents.clone(),
            parent_required: self.parent_required,
            max_scope: self.max_scope.map(|n| n as i64),
        }
    }

    pub fn from_record(record: SectionRuleRecord) -> ConfigResult<Self> {
        let mut rule = SectionRule::new(record.literal, record.category).with_parents(record.parents);
        rule.pattern = record.pattern;
        rule.metadata = record.metadata;
        if let Some(max_scope) = record.max_scope {
            if max_scope <= 0 {
                return Err(ConfigError::NonPositive {
                    literal: rule.literal,
                    field: "max_scope",
                });
            }
            rule.max_scope = Some(max_scope as usize);
        }
        if record.parent_required {
            rule = rule.with_parent_required()?;
        }
        Ok(rule)
    }

    /// Parse `{"section_rules": [...]}`.
    pub fn from_json_str(json: &str) -> ConfigResult<Vec<SectionRule>> {
        let file: SectionRuleFile = serde_json::from_str(json)?;
        file.section_rules
            .into_iter()
            .map(SectionRule::from_record)
            .collect()
    }

    pub fn from_json_file(path: &Path) -> ConfigResult<Vec<SectionRule>> {
        Self::from_json_str(&read_config_file(path)?)
    }

    pub fn to_json(rules: &[SectionRule]) -> ConfigResult<String> {
        let file = SectionRuleFile {
            section_rules: rules.iter().map(SectionRule::to_record).collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn to_json_file(rules: &[SectionRule], path: &Path) -> ConfigResult<()> {
        write_config_file(path, &Self::to_json(rules)?)
    }
}

impl Rule for SectionRule {
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

/// One entry of a `section_rules` JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionRuleRecord {
    pub literal: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<RulePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub parent_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scope: Option<i64>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SectionRuleFile {
    section_rules: Vec<SectionRuleRecord>,
}
